//! Compliment endpoints (/doorbell, /compliment)

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::{MethodRouter, post},
};
use axum_extra::extract::WithRejection;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::compliment;
use crate::config::IntakeMode;
use crate::services::error::{ApiError, LogErr};
use crate::services::fetch::download_image;

/// Multipart field carrying the snapshot
const FILE_FIELD: &str = "file";

pub fn routes(intake: IntakeMode) -> Router<Arc<AppState>> {
    let handler: MethodRouter<Arc<AppState>> = match intake {
        IntakeMode::Upload => post(upload),
        IntakeMode::Url => post(from_url),
    };

    Router::new()
        .route("/doorbell", handler.clone())
        .route("/compliment", handler)
}

#[derive(Debug, Deserialize)]
pub struct ImageUrlRequest {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct ComplimentResponse {
    pub compliment: String,
}

/// POST /doorbell - multipart upload
async fn upload(
    State(state): State<Arc<AppState>>,
    WithRejection(mut multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<ComplimentResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(ApiError::InvalidContentType);
        }

        let bytes = field.bytes().await?;
        return compliment_for(&state, bytes.to_vec()).await;
    }

    Err(ApiError::Validation(format!("Missing form field: {}", FILE_FIELD)))
}

/// POST /doorbell - JSON `{"image_url": ...}`
async fn from_url(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<ImageUrlRequest>, ApiError>,
) -> Result<Json<ComplimentResponse>, ApiError> {
    let bytes = download_image(&state.http, &req.image_url, state.max_image_bytes).await?;
    compliment_for(&state, bytes).await
}

/// Decode, extract and generate on the blocking pool
async fn compliment_for(
    state: &AppState,
    bytes: Vec<u8>,
) -> Result<Json<ComplimentResponse>, ApiError> {
    let extractor = state.extractor.clone();

    let compliment = tokio::task::spawn_blocking(move || {
        let image = decode_rgb(&bytes)?;
        let features = extractor.extract(&image);
        tracing::debug!(?features, "Extracted cues");
        Ok::<_, ApiError>(compliment::generate(&features, &mut rand::rng()))
    })
    .await
    .log_500("Feature extraction task failed")??;

    Ok(Json(ComplimentResponse { compliment }))
}

fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, ApiError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .log_as("Image decode failed", ApiError::ImageDecodeFailure)
}
