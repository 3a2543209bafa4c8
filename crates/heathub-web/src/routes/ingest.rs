//! Telemetry ingestion gate.
//!
//! Endpoints:
//! - `POST /esp32-data` - raw telemetry, one report per device per 30 s
//! - `POST /device-data` - alternate intake, 10 reports per device per 60 s
//!
//! Both validate first, then consult the rate limiter, then write: one
//! appended reading plus a conditional upsert of the control setpoint.
//! The limiter decision and the storage writes are not atomic with each
//! other; both writes are safe to retry independently.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use heathub_core::{
    desired_temp_in_bounds, round2, DeviceState, DeviceStore, RateLimitDecision, SensorReading,
};

use crate::error::ApiError;
use crate::{AppState, TELEMETRY_WINDOW_SECS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/esp32-data", post(esp32_data_handler))
        .route("/device-data", post(device_data_handler))
}

/// Incoming device report. Fields are optional so validation errors map to
/// 400 responses instead of body-rejection errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReport {
    pub device_id: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub state: Option<DeviceState>,
    pub desired_temp: Option<f64>,
}

/// Which limiter guards an intake endpoint.
enum Intake {
    Telemetry,
    Report,
}

/// Handler for `POST /esp32-data`.
async fn esp32_data_handler(
    State(state): State<AppState>,
    Json(report): Json<SensorReport>,
) -> Result<impl IntoResponse, ApiError> {
    let reading = submit(&state, report, Intake::Telemetry).await?;
    let next_submission = reading.captured_at + Duration::seconds(TELEMETRY_WINDOW_SECS);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "deviceId": reading.device_id,
            "timestamp": reading.captured_at.to_rfc3339(),
            "nextSubmission": next_submission.to_rfc3339(),
        })),
    ))
}

/// Handler for `POST /device-data`.
async fn device_data_handler(
    State(state): State<AppState>,
    Json(report): Json<SensorReport>,
) -> Result<impl IntoResponse, ApiError> {
    let reading = submit(&state, report, Intake::Report).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "timestamp": reading.captured_at.to_rfc3339(),
        })),
    ))
}

/// Validate, rate-limit and persist one device report.
async fn submit(
    state: &AppState,
    report: SensorReport,
    intake: Intake,
) -> Result<SensorReading, ApiError> {
    let (device_id, temperature, humidity) = validate(&report)?;
    let now = Utc::now();

    // Budget is consumed only after validation, exactly once per accepted
    // report, and regardless of how the writes below fare.
    check_rate_limit(state, &device_id, now, intake).await?;

    let reading = SensorReading {
        device_id: device_id.clone(),
        temperature: round2(temperature),
        humidity: round2(humidity),
        state: report.state.unwrap_or_default(),
        desired_temp: report.desired_temp,
        captured_at: now,
    };

    {
        let mut store = state.store.write().await;
        store
            .insert_reading(reading.clone())
            .map_err(ApiError::storage(&device_id))?;
        store
            .merge_desired_temp(&device_id, report.desired_temp, now)
            .map_err(ApiError::storage(&device_id))?;
    }

    state.cache.lock().await.invalidate(&device_id);

    tracing::info!(device_id = %device_id, temperature, humidity, "accepted device report");
    Ok(reading)
}

fn validate(report: &SensorReport) -> Result<(String, f64, f64), ApiError> {
    let device_id = report
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Valid deviceId is required".into()))?;

    let temperature = report
        .temperature
        .filter(|t| t.is_finite())
        .ok_or_else(|| ApiError::InvalidInput("Temperature must be a valid number".into()))?;

    let humidity = report
        .humidity
        .filter(|h| h.is_finite())
        .ok_or_else(|| ApiError::InvalidInput("Humidity must be a valid number".into()))?;

    // A reported setpoint is merged into the control row, so it is held to
    // the same bounds as a dashboard write.
    if let Some(desired) = report.desired_temp {
        if !desired_temp_in_bounds(desired) {
            return Err(ApiError::InvalidInput(
                "Invalid temperature range (10-35)".into(),
            ));
        }
    }

    Ok((device_id.to_string(), temperature, humidity))
}

async fn check_rate_limit(
    state: &AppState,
    device_id: &str,
    now: DateTime<Utc>,
    intake: Intake,
) -> Result<(), ApiError> {
    let decision = match intake {
        Intake::Telemetry => state
            .telemetry_limiter
            .lock()
            .await
            .try_accept(device_id, now),
        Intake::Report => state.report_limiter.lock().await.try_accept(device_id, now),
    };

    match decision {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Throttled { retry_at } => {
            tracing::debug!(device_id, %retry_at, "report throttled");
            Err(ApiError::TooFrequent { retry_at })
        }
    }
}
