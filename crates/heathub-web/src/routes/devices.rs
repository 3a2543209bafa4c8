//! Dashboard device endpoints and public device status.
//!
//! Endpoints:
//! - `GET /api/devices` - caller's devices joined with their latest reading
//! - `POST /api/devices` - attach a device id to the caller
//! - `GET /api/devices/history?deviceId=&period=` - chart buckets
//! - `GET /device-status?deviceId=` - latest reading + current settings

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use heathub_core::{aggregate, DeviceState, DeviceStore, Granularity, Mode, Power};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::control::{fetch_control, DeviceQuery};
use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_devices_handler).post(attach_device_handler))
        .route("/history", get(history_handler))
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/device-status", get(device_status_handler))
}

/// One row of the dashboard device list: control settings joined with the
/// most recent reading (absent when the device never reported).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: String,
    pub mode: Mode,
    pub desired_temp: f64,
    pub power: Power,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// Handler for `GET /api/devices`.
async fn list_devices_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device_ids = state.store.read().await.devices_for(&user_id)?;

    let mut summaries = Vec::with_capacity(device_ids.len());
    for device_id in device_ids {
        let settings = fetch_control(&state, &device_id).await?;
        let latest = state
            .store
            .read()
            .await
            .latest_reading(&device_id)
            .map_err(ApiError::storage(&device_id))?;

        summaries.push(DeviceSummary {
            device_id,
            mode: settings.mode,
            desired_temp: settings.desired_temp,
            power: settings.power,
            updated_at: settings.updated_at,
            temperature: latest.as_ref().map(|r| r.temperature),
            humidity: latest.as_ref().map(|r| r.humidity),
            state: latest.as_ref().map(|r| r.state),
            last_reading_at: latest.as_ref().map(|r| r.captured_at),
        });
    }

    Ok(Json(json!({
        "status": "success",
        "results": summaries.len(),
        "data": summaries,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    pub device_id: Option<String>,
}

/// Handler for `POST /api/devices`: attach a device to the caller.
async fn attach_device_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<AttachRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let device_id = request
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Device ID is required".into()))?;

    state
        .store
        .write()
        .await
        .attach_device(&user_id, device_id)
        .map_err(ApiError::storage(device_id))?;

    tracing::info!(device_id, user_id = %user_id, "device attached to user");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "deviceId": device_id })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub device_id: Option<String>,
    pub period: Option<String>,
}

/// Handler for `GET /api/devices/history`.
async fn history_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device_id = query
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("deviceId query parameter is required".into()))?;

    let granularity: Granularity = query
        .period
        .as_deref()
        .unwrap_or("hourly")
        .parse()
        .map_err(|_| ApiError::InvalidInput("Invalid period".into()))?;

    let store = state.store.read().await;
    if !store
        .user_owns(&user_id, device_id)
        .map_err(ApiError::storage(device_id))?
    {
        return Err(ApiError::NotFound);
    }
    let readings = store
        .readings_for(device_id)
        .map_err(ApiError::storage(device_id))?;
    drop(store);

    let buckets = aggregate(&readings, granularity, Utc::now());

    Ok(Json(json!({
        "status": "success",
        "results": buckets.len(),
        "data": buckets,
    })))
}

/// Handler for `GET /device-status`: latest reading joined with settings.
async fn device_status_handler(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device_id = query
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Device ID is required".into()))?;

    let latest = state
        .store
        .read()
        .await
        .latest_reading(device_id)
        .map_err(ApiError::storage(device_id))?
        .ok_or(ApiError::NotFound)?;

    let settings = fetch_control(&state, device_id).await?;

    Ok(Json(json!({
        "deviceId": device_id,
        "currentTemp": latest.temperature,
        "currentHumidity": latest.humidity,
        "lastUpdate": latest.captured_at.to_rfc3339(),
        "mode": settings.mode,
        "desiredTemp": settings.desired_temp,
        "power": settings.power,
    })))
}
