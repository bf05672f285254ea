//! Remote image download for the URL intake

use reqwest::Client;

use super::error::ApiError;

/// Fetch `url` and return the body bytes, capped at `max_bytes`.
/// Any transport failure or non-2xx status becomes `ImageFetchFailure`.
pub async fn download_image(client: &Client, url: &str, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::debug!("Image download from {} failed: {}", url, e);
            ApiError::ImageFetchFailure(e.to_string())
        })?;

    if let Some(len) = response.content_length() {
        if len as usize > max_bytes {
            return Err(too_large(max_bytes));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ApiError::ImageFetchFailure(e.to_string()))?
    {
        if body.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::ImageFetchFailure(format!("image exceeds {} bytes", max_bytes))
}
