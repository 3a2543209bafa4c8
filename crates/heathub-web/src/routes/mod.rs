//! HTTP route handlers for the heathub backend.
//!
//! Routes are split by caller:
//! - device-facing intake and polling at the root (`/esp32-data`,
//!   `/device-data`, `/device-control`, `/device-status`)
//! - authenticated dashboard API under `/api/devices`

pub mod control;
pub mod devices;
pub mod ingest;

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::{response::Json, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        // Device-facing endpoints
        .merge(ingest::routes())
        .merge(control::device_routes())
        .merge(devices::status_routes())
        // Dashboard API
        .nest("/api/devices", api_device_routes())
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Authenticated `/api/devices` routes.
fn api_device_routes() -> Router<AppState> {
    Router::new()
        .merge(devices::api_routes())
        .merge(control::api_routes())
}

/// Handler for `GET /api/health`.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
