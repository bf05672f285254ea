mod compliment;
mod config;
mod constants;
mod logging;
mod routes;
mod services;

use axum::{Router, extract::DefaultBodyLimit};
use doorbell_vision::{CueExtractor, FeatureExtractor};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::{Config, IntakeMode};

/// Read-only state shared by every request
pub struct AppState {
    pub extractor: Arc<dyn FeatureExtractor>,
    pub http: reqwest::Client,
    pub max_image_bytes: usize,
}

pub fn build_app(state: AppState, intake: IntakeMode) -> Router {
    let body_limit = state.max_image_bytes;

    routes::build_routes(intake)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[tokio::main]
async fn main() {
    logging::init();

    let config = Config::from_env();
    tracing::info!(
        "Starting doorbell service (intake: {:?}, backbone: {}, face cascade: {:?})",
        config.intake,
        config.vision.backbone_repo.as_deref().unwrap_or("disabled"),
        config.vision.face_cascade,
    );

    // Weight and cascade downloads are blocking
    let vision = config.vision.clone();
    let extractor = tokio::task::spawn_blocking(move || CueExtractor::load(&vision))
        .await
        .expect("Vision loader panicked")
        .expect("Failed to load vision models");
    if !extractor.detects_faces() {
        tracing::warn!("Face detection is off, face compliments will never be chosen");
    }

    let http = reqwest::Client::builder()
        .timeout(config.download_timeout)
        .build()
        .expect("Failed to create HTTP client");

    let state = AppState {
        extractor: Arc::new(extractor),
        http,
        max_image_bytes: config.max_image_bytes,
    };

    let app = build_app(state, config.intake);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
