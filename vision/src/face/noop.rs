use image::GrayImage;

use super::{FaceBounds, FaceDetector};

/// Detector that never finds a face - used when face detection is disabled
pub struct NoFaceDetector;

impl NoFaceDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for NoFaceDetector {
    fn detect(&self, _gray: &GrayImage) -> Vec<FaceBounds> {
        vec![]
    }

    fn is_active(&self) -> bool {
        false
    }
}
