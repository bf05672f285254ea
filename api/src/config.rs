//! Runtime configuration read from the environment at startup

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use doorbell_vision::backbone::DEFAULT_MODEL_REPO;
use doorbell_vision::{CascadeSource, VisionOptions};

use crate::constants::{DEFAULT_PORT, DOWNLOAD_TIMEOUT_SECS, MAX_IMAGE_BYTES};

/// How `/doorbell` receives its image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeMode {
    /// Multipart upload, field `file`
    Upload,
    /// JSON body `{"image_url": ...}`
    Url,
}

impl FromStr for IntakeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upload" | "file" | "multipart" => Ok(IntakeMode::Upload),
            "url" | "image_url" => Ok(IntakeMode::Url),
            other => Err(format!("unknown intake mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub intake: IntakeMode,
    pub vision: VisionOptions,
    pub max_image_bytes: usize,
    pub download_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_PORT);

        let intake = match lookup("DOORBELL_INTAKE") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("[config] {}, falling back to upload", e);
                IntakeMode::Upload
            }),
            None => IntakeMode::Upload,
        };

        let model_repo = lookup("VISION_MODEL_REPO")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_REPO.to_string());
        let backbone_repo = match lookup("VISION_BACKBONE").as_deref().map(str::trim) {
            Some("none") | Some("off") | Some("disabled") => None,
            Some("resnet18") | Some("") | None => Some(model_repo),
            Some(other) => {
                tracing::warn!("[config] Unknown VISION_BACKBONE {:?}, using resnet18", other);
                Some(model_repo)
            }
        };

        let cascade_path = lookup("FACE_CASCADE_PATH").filter(|s| !s.trim().is_empty());
        let cascade_url = lookup("FACE_CASCADE_URL").filter(|s| !s.trim().is_empty());
        let face_cascade = match (cascade_path.as_deref().map(str::trim), cascade_url) {
            (Some("none") | Some("off") | Some("disabled"), _) => CascadeSource::Disabled,
            (Some(path), _) => CascadeSource::File(PathBuf::from(path)),
            (None, Some(url)) => CascadeSource::Remote(url),
            (None, None) => CascadeSource::default(),
        };

        let max_image_bytes = lookup("MAX_IMAGE_BYTES")
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(MAX_IMAGE_BYTES);

        let download_timeout = lookup("DOWNLOAD_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DOWNLOAD_TIMEOUT_SECS);

        Self {
            port,
            intake,
            vision: VisionOptions {
                backbone_repo,
                face_cascade,
            },
            max_image_bytes,
            download_timeout: Duration::from_secs(download_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.intake, IntakeMode::Upload);
        assert_eq!(config.vision.backbone_repo.as_deref(), Some(DEFAULT_MODEL_REPO));
        assert_eq!(config.vision.face_cascade, CascadeSource::default());
        assert_eq!(config.max_image_bytes, MAX_IMAGE_BYTES);
        assert_eq!(config.download_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("DOORBELL_INTAKE", "URL"),
            ("VISION_BACKBONE", "none"),
            ("FACE_CASCADE_PATH", "/models/haarcascade_frontalface_default.xml"),
            ("DOWNLOAD_TIMEOUT_SECS", "3"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.intake, IntakeMode::Url);
        assert!(config.vision.backbone_repo.is_none());
        assert_eq!(
            config.vision.face_cascade,
            CascadeSource::File(PathBuf::from("/models/haarcascade_frontalface_default.xml"))
        );
        assert_eq!(config.download_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("DOORBELL_INTAKE", "carrier-pigeon"),
            ("MAX_IMAGE_BYTES", "0"),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.intake, IntakeMode::Upload);
        assert_eq!(config.max_image_bytes, MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_face_cascade_sources() {
        let config = config_from(&[("FACE_CASCADE_URL", "https://mirror.local/face.xml")]);
        assert_eq!(
            config.vision.face_cascade,
            CascadeSource::Remote("https://mirror.local/face.xml".to_string())
        );

        let config = config_from(&[
            ("FACE_CASCADE_PATH", "off"),
            ("FACE_CASCADE_URL", "https://mirror.local/face.xml"),
        ]);
        assert_eq!(config.vision.face_cascade, CascadeSource::Disabled);
    }

    #[test]
    fn test_custom_model_repo() {
        let config = config_from(&[("VISION_MODEL_REPO", "acme/resnet-mirror")]);
        assert_eq!(config.vision.backbone_repo.as_deref(), Some("acme/resnet-mirror"));
    }
}
