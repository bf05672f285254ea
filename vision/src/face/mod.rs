use image::GrayImage;

/// Bounding box of a detected face, in pixels of the image passed to the
/// detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Pluggable face detection backend
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a grayscale image
    fn detect(&self, gray: &GrayImage) -> Vec<FaceBounds>;

    /// False for the stand-in used when detection is switched off
    fn is_active(&self) -> bool {
        true
    }
}

mod cascade;
pub mod download;
#[cfg(test)]
pub(crate) mod fixtures;
mod grouping;
mod noop;

pub use cascade::{DetectionParams, HaarCascade};
pub use download::DEFAULT_CASCADE_URL;
pub use grouping::group_rectangles;
pub use noop::NoFaceDetector;
