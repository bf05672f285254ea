//! Application constants

/// Port used when `PORT` is unset
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum accepted image size, for uploads and downloads alike (20 MB)
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Timeout for fetching a remote image (10 seconds)
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";
