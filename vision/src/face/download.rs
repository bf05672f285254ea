//! Fetch-once cache for remote cascade files

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::HaarCascade;

/// OpenCV's stock frontal face cascade
pub const DEFAULT_CASCADE_URL: &str = "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

const CACHE_SUBDIR: &str = "doorbell";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-user cache directory for downloaded model files
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join(CACHE_SUBDIR)
}

/// Local copy of the cascade at `url`, downloaded into `cache_dir` on first
/// use. Downloads are parsed before they are cached.
pub fn cached_cascade(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let path = cache_dir.join(file_name(url)?);
    if path.is_file() {
        log::info!("Using cached face cascade {}", path.display());
        return Ok(path);
    }

    log::info!("Downloading face cascade from {}", url);
    let client = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
    let xml = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .with_context(|| format!("Failed to download face cascade from {}", url))?;
    HaarCascade::from_xml(&xml).context("Downloaded face cascade is invalid")?;

    fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;
    let partial = path.with_extension("part");
    fs::write(&partial, &xml)?;
    fs::rename(&partial, &path)?;

    Ok(path)
}

fn file_name(url: &str) -> Result<&str> {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("Cascade URL has no file name: {}", url))
}
