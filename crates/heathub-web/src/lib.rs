//! # heathub-web
//!
//! REST API for the heathub smart-heating backend.
//!
//! This crate provides:
//! - Device-facing endpoints: telemetry intake and control polling
//! - Dashboard endpoints under `/api/devices` (bearer-token authenticated)
//! - The history endpoint feeding the charts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use heathub_web::{create_router, AppState};
//!
//! let state = AppState::new(MemoryStore::new(), tokens);
//! let app = create_router(state);
//!
//! let listener = TcpListener::bind("0.0.0.0:4000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod error;
pub mod routes;

// Re-exports
pub use error::ApiError;
pub use routes::create_router;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{Mutex, RwLock};

use heathub_core::{DeviceStore, IntervalLimiter, SettingsCache, WindowLimiter};

/// Minimum interval between accepted reports on `POST /esp32-data`.
pub const TELEMETRY_WINDOW_SECS: i64 = 30;

/// Rolling window and budget for `POST /device-data`.
pub const REPORT_WINDOW_SECS: i64 = 60;
pub const REPORT_WINDOW_MAX: u32 = 10;

/// Shared state for all route handlers.
///
/// The store is authoritative; cache and limiters are process-local and
/// reset on restart. Everything is wrapped for concurrent handler access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Box<dyn DeviceStore>>>,
    pub cache: Arc<Mutex<SettingsCache>>,
    pub telemetry_limiter: Arc<Mutex<IntervalLimiter>>,
    pub report_limiter: Arc<Mutex<WindowLimiter>>,
    /// Bearer token -> user id. Token issuance lives outside this service.
    pub tokens: Arc<HashMap<String, String>>,
}

impl AppState {
    /// Create server state over a storage backend and a token registry.
    pub fn new<S: DeviceStore + 'static>(store: S, tokens: HashMap<String, String>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Box::new(store))),
            cache: Arc::new(Mutex::new(SettingsCache::new())),
            telemetry_limiter: Arc::new(Mutex::new(IntervalLimiter::new(Duration::seconds(
                TELEMETRY_WINDOW_SECS,
            )))),
            report_limiter: Arc::new(Mutex::new(WindowLimiter::new(
                Duration::seconds(REPORT_WINDOW_SECS),
                REPORT_WINDOW_MAX,
            ))),
            tokens: Arc::new(tokens),
        }
    }
}
