//! Visual cue extraction for the doorbell compliment service.
//!
//! An image goes in, a [`FeatureMap`] comes out. The cues come from three
//! places: a pretrained convolutional backbone (embedding energy), plain pixel
//! statistics (brightness, colorfulness, centering) and a Haar cascade face
//! detector.

use image::RgbImage;

pub mod backbone;
pub mod extractor;
pub mod face;
pub mod stats;

pub use backbone::Backbone;
pub use extractor::{CascadeSource, CueExtractor, VisionOptions};

/// Visual cues extracted from a single image.
///
/// Every cue is always present; anything that could not be computed keeps its
/// `Default` value (`0.0` / `false`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureMap {
    /// Euclidean norm of the pooled backbone embedding
    pub energy: f32,
    /// Mean grayscale intensity (0-255)
    pub brightness: f32,
    /// Standard deviation over every RGB channel value
    pub colorfulness: f32,
    /// At least one face survived cascade grouping
    pub has_face: bool,
    /// Central crop is at least as bright as the frame overall (within 5%)
    pub centered: bool,
}

/// Pluggable feature extraction so callers can swap in stubs
pub trait FeatureExtractor: Send + Sync {
    /// Derive the cue set for a decoded RGB image. Never fails.
    fn extract(&self, image: &RgbImage) -> FeatureMap;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_feature_map_fires_no_cue() {
        let features = FeatureMap::default();
        assert_eq!(features.energy, 0.0);
        assert_eq!(features.brightness, 0.0);
        assert_eq!(features.colorfulness, 0.0);
        assert!(!features.has_face);
        assert!(!features.centered);
    }
}
