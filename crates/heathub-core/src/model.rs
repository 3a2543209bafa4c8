//! heathub data model types.
//!
//! Wire names are camelCase (`deviceId`, `desiredTemp`, ...), so these
//! types serialize directly into HTTP responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound for a desired-temperature setpoint, in °C.
pub const DESIRED_TEMP_MIN: f64 = 10.0;

/// Upper bound for a desired-temperature setpoint, in °C.
pub const DESIRED_TEMP_MAX: f64 = 35.0;

/// Setpoint used when a device has no stored control settings.
pub const DEFAULT_DESIRED_TEMP: f64 = 25.0;

/// Actuation state reported by a device alongside its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    #[default]
    Unknown,
    On,
    Off,
}

/// Control mode: `auto` lets the controller decide actuation, `manual`
/// forces the user-chosen power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Manual,
}

/// Desired power state of the heating unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    On,
    Off,
}

/// A single telemetry report from a device. Immutable once written;
/// the telemetry log is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub device_id: String,

    /// Measured temperature in °C, rounded to two decimals at ingestion.
    pub temperature: f64,

    /// Measured relative humidity in %, rounded to two decimals at ingestion.
    pub humidity: f64,

    pub state: DeviceState,

    /// Setpoint the device reported, if it reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_temp: Option<f64>,

    pub captured_at: DateTime<Utc>,
}

/// Latest desired configuration for one device. One row per device,
/// upserted by device reports and user commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSettings {
    pub device_id: String,
    pub mode: Mode,
    pub desired_temp: f64,
    pub power: Power,
    pub updated_at: DateTime<Utc>,
}

impl ControlSettings {
    /// The documented defaults for a device with no stored settings:
    /// `{mode: auto, desiredTemp: 25.0, power: on}`.
    pub fn defaults(device_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.to_string(),
            mode: Mode::Auto,
            desired_temp: DEFAULT_DESIRED_TEMP,
            power: Power::On,
            updated_at: now,
        }
    }
}

/// Partial control update. Omitted fields retain their stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_temp: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<Power>,
}

impl ControlUpdate {
    /// True when the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.desired_temp.is_none() && self.mode.is_none() && self.power.is_none()
    }
}

/// Check a setpoint against the authoritative bounds.
pub fn desired_temp_in_bounds(value: f64) -> bool {
    value.is_finite() && (DESIRED_TEMP_MIN..=DESIRED_TEMP_MAX).contains(&value)
}

/// Round a measurement to two decimal places, as stored readings are.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reading_wire_names() {
        let reading = SensorReading {
            device_id: "Room-01".to_string(),
            temperature: 21.3,
            humidity: 55.7,
            state: DeviceState::On,
            desired_temp: Some(22.0),
            captured_at: "2026-08-23T09:00:00Z".parse().unwrap(),
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["deviceId"], "Room-01");
        assert_eq!(json["desiredTemp"], 22.0);
        assert_eq!(json["state"], "on");
        assert!(json["capturedAt"].is_string());
    }

    #[test]
    fn test_reading_desired_temp_omitted() {
        let reading = SensorReading {
            device_id: "Room-01".to_string(),
            temperature: 21.3,
            humidity: 55.7,
            state: DeviceState::Unknown,
            desired_temp: None,
            captured_at: Utc::now(),
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert!(json.get("desiredTemp").is_none());
    }

    #[test]
    fn test_control_defaults() {
        let now = Utc::now();
        let settings = ControlSettings::defaults("Room-01", now);

        assert_eq!(settings.mode, Mode::Auto);
        assert_eq!(settings.desired_temp, 25.0);
        assert_eq!(settings.power, Power::On);
        assert_eq!(settings.updated_at, now);
    }

    #[test]
    fn test_control_update_deserialize_partial() {
        let update: ControlUpdate = serde_json::from_str(r#"{"power":"off"}"#).unwrap();
        assert_eq!(update.power, Some(Power::Off));
        assert_eq!(update.mode, None);
        assert_eq!(update.desired_temp, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_desired_temp_bounds() {
        assert!(desired_temp_in_bounds(10.0));
        assert!(desired_temp_in_bounds(35.0));
        assert!(desired_temp_in_bounds(21.5));
        assert!(!desired_temp_in_bounds(9.99));
        assert!(!desired_temp_in_bounds(40.0));
        assert!(!desired_temp_in_bounds(f64::NAN));
        assert!(!desired_temp_in_bounds(f64::INFINITY));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(21.347), 21.35);
        assert_eq!(round2(55.704), 55.7);
        assert_eq!(round2(-0.005), -0.01);
    }
}
