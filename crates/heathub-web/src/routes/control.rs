//! Control-settings read/write surface.
//!
//! Endpoints:
//! - `GET /device-control?deviceId=` - device poll, cache-first, no auth
//! - `GET /api/devices/control?deviceId=` - dashboard read, ownership-checked
//! - `PUT /api/devices/control` - dashboard update, ownership-checked
//!
//! Reads go cache -> store -> documented defaults (defaults are cached but
//! never persisted). Writes go store-first and only then refresh the cache,
//! so the cache never serves settings that did not durably commit.

use axum::extract::{Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use heathub_core::{
    desired_temp_in_bounds, ControlSettings, ControlUpdate, DeviceStore, Mode, Power,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::AppState;

pub fn device_routes() -> Router<AppState> {
    Router::new().route("/device-control", get(poll_control_handler))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/control", get(get_control_handler))
        .route("/control", put(update_control_handler))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

/// Update request. Enum fields arrive as raw strings so violations map to
/// the 400 category instead of a body-rejection error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub device_id: Option<String>,
    pub desired_temp: Option<f64>,
    pub mode: Option<String>,
    pub power: Option<String>,
}

/// Cache-first settings lookup, falling back to the store and finally to
/// the documented defaults. Defaults are cached without being persisted;
/// only an explicit write creates the store row.
pub(crate) async fn fetch_control(
    state: &AppState,
    device_id: &str,
) -> Result<ControlSettings, ApiError> {
    if let Some(settings) = state.cache.lock().await.get(device_id) {
        return Ok(settings);
    }

    let stored = state
        .store
        .read()
        .await
        .control(device_id)
        .map_err(ApiError::storage(device_id))?;
    let settings = match stored {
        Some(settings) => settings,
        None => ControlSettings::defaults(device_id, Utc::now()),
    };

    state.cache.lock().await.put(settings.clone());
    Ok(settings)
}

fn require_device_id(query: Option<&str>) -> Result<&str, ApiError> {
    query
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Device ID is required".into()))
}

/// Handler for `GET /device-control` (device poll).
async fn poll_control_handler(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<ControlSettings>, ApiError> {
    let device_id = require_device_id(query.device_id.as_deref())?;
    let settings = fetch_control(&state, device_id).await?;
    Ok(Json(settings))
}

/// Handler for `GET /api/devices/control` (dashboard read).
async fn get_control_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device_id = require_device_id(query.device_id.as_deref())?;

    if !state
        .store
        .read()
        .await
        .user_owns(&user_id, device_id)
        .map_err(ApiError::storage(device_id))?
    {
        return Err(ApiError::NotFound);
    }

    let settings = fetch_control(&state, device_id).await?;
    Ok(Json(json!({ "status": "success", "data": settings })))
}

/// Handler for `PUT /api/devices/control` (dashboard update).
async fn update_control_handler(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ControlRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let device_id = require_device_id(request.device_id.as_deref())?.to_string();
    let update = validate_update(&request)?;

    if !state
        .store
        .read()
        .await
        .user_owns(&user_id, &device_id)
        .map_err(ApiError::storage(&device_id))?
    {
        return Err(ApiError::NotFound);
    }

    // Store first; the cache is only refreshed after the durable commit.
    let settings = state
        .store
        .write()
        .await
        .upsert_control(&device_id, &update, Utc::now())
        .map_err(ApiError::storage(&device_id))?;
    state.cache.lock().await.put(settings.clone());

    tracing::info!(device_id = %device_id, user_id = %user_id, "device control updated");
    Ok(Json(json!({
        "status": "success",
        "message": "Device control updated",
        "data": settings,
    })))
}

fn validate_update(request: &ControlRequest) -> Result<ControlUpdate, ApiError> {
    let mode = match request.mode.as_deref() {
        None => None,
        Some("auto") => Some(Mode::Auto),
        Some("manual") => Some(Mode::Manual),
        Some(_) => return Err(ApiError::InvalidInput("Invalid mode".into())),
    };

    let power = match request.power.as_deref() {
        None => None,
        Some("on") => Some(Power::On),
        Some("off") => Some(Power::Off),
        Some(_) => return Err(ApiError::InvalidInput("Invalid power value".into())),
    };

    if let Some(desired) = request.desired_temp {
        if !desired_temp_in_bounds(desired) {
            return Err(ApiError::InvalidInput(
                "Invalid temperature range (10-35)".into(),
            ));
        }
    }

    let update = ControlUpdate {
        desired_temp: request.desired_temp,
        mode,
        power,
    };
    if update.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".into()));
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(desired_temp: Option<f64>, mode: Option<&str>, power: Option<&str>) -> ControlRequest {
        ControlRequest {
            device_id: Some("Room-01".to_string()),
            desired_temp,
            mode: mode.map(String::from),
            power: power.map(String::from),
        }
    }

    #[test]
    fn test_validate_update_accepts_partial() {
        let update = validate_update(&request(None, None, Some("off"))).unwrap();
        assert_eq!(update.power, Some(Power::Off));
        assert_eq!(update.mode, None);
        assert_eq!(update.desired_temp, None);
    }

    #[test]
    fn test_validate_update_rejects_out_of_range() {
        assert!(validate_update(&request(Some(40.0), None, None)).is_err());
        assert!(validate_update(&request(Some(9.5), None, None)).is_err());
        assert!(validate_update(&request(Some(35.0), None, None)).is_ok());
    }

    #[test]
    fn test_validate_update_rejects_empty_update() {
        assert!(validate_update(&request(None, None, None)).is_err());
    }

    #[test]
    fn test_validate_update_rejects_bad_enums() {
        assert!(validate_update(&request(None, Some("turbo"), None)).is_err());
        assert!(validate_update(&request(None, None, Some("maybe"))).is_err());
        assert!(validate_update(&request(None, Some("manual"), Some("on"))).is_ok());
    }
}
