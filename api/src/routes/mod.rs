pub mod doorbell;
pub mod health;

use axum::Router;
use std::sync::Arc;

use crate::AppState;
use crate::config::IntakeMode;

/// Build all routes for the API
pub fn build_routes(intake: IntakeMode) -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(doorbell::routes(intake))
}
