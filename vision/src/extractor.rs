use anyhow::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};

use crate::backbone::Backbone;
use crate::face::{DEFAULT_CASCADE_URL, FaceDetector, HaarCascade, NoFaceDetector, download};
use crate::{FeatureExtractor, FeatureMap, stats};

/// Where the Haar cascade XML comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeSource {
    /// Downloaded once, then read from the local cache
    Remote(String),
    File(PathBuf),
    /// No detection, `has_face` is always false
    Disabled,
}

impl Default for CascadeSource {
    fn default() -> Self {
        CascadeSource::Remote(DEFAULT_CASCADE_URL.to_string())
    }
}

/// What to load at startup
#[derive(Debug, Clone, Default)]
pub struct VisionOptions {
    /// hf-hub repo holding the backbone weights; `None` skips the forward
    /// pass and reports zero energy
    pub backbone_repo: Option<String>,
    pub face_cascade: CascadeSource,
}

/// Combines the backbone, pixel statistics and face detector into the cue set
pub struct CueExtractor {
    backbone: Option<Backbone>,
    face_detector: Box<dyn FaceDetector>,
}

impl CueExtractor {
    pub fn new(backbone: Option<Backbone>, face_detector: Box<dyn FaceDetector>) -> Self {
        Self {
            backbone,
            face_detector,
        }
    }

    /// Load the configured models. Blocking: may download weights.
    pub fn load(options: &VisionOptions) -> Result<Self> {
        let backbone = match &options.backbone_repo {
            Some(repo) => Some(Backbone::new(repo)?),
            None => {
                log::warn!("Backbone disabled, energy will always be 0");
                None
            }
        };

        let face_detector = load_face_detector(&options.face_cascade, &download::cache_dir())?;

        Ok(Self::new(backbone, face_detector))
    }

    pub fn detects_faces(&self) -> bool {
        self.face_detector.is_active()
    }

    fn energy(&self, image: &RgbImage) -> f32 {
        let Some(backbone) = &self.backbone else {
            return 0.0;
        };

        match backbone.energy(image) {
            Ok(energy) => energy,
            Err(e) => {
                log::warn!("Backbone forward pass failed, using zero energy: {}", e);
                0.0
            }
        }
    }
}

fn load_face_detector(source: &CascadeSource, cache_dir: &Path) -> Result<Box<dyn FaceDetector>> {
    let path = match source {
        CascadeSource::Remote(url) => download::cached_cascade(url, cache_dir)?,
        CascadeSource::File(path) => path.clone(),
        CascadeSource::Disabled => {
            log::warn!("Face detection disabled, has_face will always be false");
            return Ok(Box::new(NoFaceDetector::new()));
        }
    };

    Ok(Box::new(HaarCascade::from_file(&path)?))
}

impl FeatureExtractor for CueExtractor {
    fn extract(&self, image: &RgbImage) -> FeatureMap {
        let energy = self.energy(image);

        let gray = stats::grayscale(image);
        let brightness = stats::brightness(&gray);
        let colorfulness = stats::colorfulness(image);
        let has_face = !self.face_detector.detect(&gray).is_empty();
        let centered = stats::is_centered(&gray);

        FeatureMap {
            energy,
            brightness,
            colorfulness,
            has_face,
            centered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::FaceBounds;
    use crate::face::fixtures::cascade_xml;
    use image::{GrayImage, Rgb};

    struct AlwaysFace;

    impl FaceDetector for AlwaysFace {
        fn detect(&self, gray: &GrayImage) -> Vec<FaceBounds> {
            vec![FaceBounds {
                x: 0,
                y: 0,
                width: gray.width() as i32,
                height: gray.height() as i32,
            }]
        }
    }

    #[test]
    fn test_extract_without_models_fills_defaults() {
        let extractor = CueExtractor::new(None, Box::new(NoFaceDetector::new()));
        let image = RgbImage::from_pixel(224, 224, Rgb([73, 109, 137]));

        let features = extractor.extract(&image);
        assert_eq!(features.energy, 0.0);
        assert_eq!(features.brightness, 101.0);
        assert!((features.colorfulness - 26.196).abs() < 0.01);
        assert!(!features.has_face);
        assert!(features.centered);
    }

    #[test]
    fn test_detected_face_sets_flag() {
        let extractor = CueExtractor::new(None, Box::new(AlwaysFace));
        let image = RgbImage::from_pixel(32, 32, Rgb([250, 250, 250]));

        let features = extractor.extract(&image);
        assert!(features.has_face);
        assert!(features.brightness > 140.0);
    }

    fn without_models() -> VisionOptions {
        VisionOptions {
            backbone_repo: None,
            face_cascade: CascadeSource::Disabled,
        }
    }

    #[test]
    fn test_load_without_models_succeeds() {
        let extractor = CueExtractor::load(&without_models()).expect("load without models");
        assert!(!extractor.detects_faces());
        let features = extractor.extract(&RgbImage::from_pixel(8, 8, Rgb([0, 0, 0])));
        assert_eq!(features, FeatureMap {
            centered: true,
            ..FeatureMap::default()
        });
    }

    #[test]
    fn test_load_reports_missing_cascade() {
        let options = VisionOptions {
            backbone_repo: None,
            face_cascade: CascadeSource::File(PathBuf::from("/nonexistent/haarcascade.xml")),
        };
        assert!(CueExtractor::load(&options).is_err());
    }

    #[test]
    fn test_default_options_use_stock_cascade() {
        assert_eq!(
            VisionOptions::default().face_cascade,
            CascadeSource::Remote(DEFAULT_CASCADE_URL.to_string())
        );
    }

    #[test]
    fn test_default_cascade_loads_a_real_detector() {
        let cache = tempfile::tempdir().unwrap();
        std::fs::write(
            cache.path().join("haarcascade_frontalface_default.xml"),
            cascade_xml(-1.0, (1.0, 1.0), ""),
        )
        .unwrap();

        let detector = load_face_detector(&CascadeSource::default(), cache.path()).unwrap();
        assert!(detector.is_active());

        let extractor = CueExtractor::new(None, detector);
        assert!(extractor.detects_faces());
        let features = extractor.extract(&RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])));
        assert!(features.has_face);
    }

    #[test]
    fn test_disabled_cascade_loads_noop() {
        let cache = tempfile::tempdir().unwrap();
        let detector = load_face_detector(&CascadeSource::Disabled, cache.path()).unwrap();
        assert!(!detector.is_active());
    }
}
