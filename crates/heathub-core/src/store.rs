//! Device state storage.
//!
//! `DeviceStore` is the stable interface in front of the persistence
//! backend. The telemetry log is append-only; control settings are one
//! row per device, written through insert-or-merge operations so that
//! concurrent writers never create duplicate rows.
//!
//! `MemoryStore` is the in-process implementation. A relational or
//! document backend can replace it without touching the web layer.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::{ControlSettings, ControlUpdate, SensorReading, DEFAULT_DESIRED_TEMP};

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete an I/O operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Abstract storage for readings, control settings and device ownership.
///
/// Reads take `&self`, writes `&mut self`; callers wrap implementations in
/// a lock for concurrent access. All methods are synchronous so the trait
/// stays object-safe and runtime-agnostic.
pub trait DeviceStore: Send + Sync {
    /// Append one sensor reading to the telemetry log.
    fn insert_reading(&mut self, reading: SensorReading) -> Result<(), StoreError>;

    /// The most recent reading for a device, if it ever reported.
    fn latest_reading(&self, device_id: &str) -> Result<Option<SensorReading>, StoreError>;

    /// All readings for a device, ordered by capture time ascending.
    fn readings_for(&self, device_id: &str) -> Result<Vec<SensorReading>, StoreError>;

    /// The stored control settings for a device, if any.
    fn control(&self, device_id: &str) -> Result<Option<ControlSettings>, StoreError>;

    /// Insert-or-merge a partial control update. An absent row is created
    /// from the documented defaults before the update is applied; a present
    /// row keeps every field the update omits. Returns the stored row.
    fn upsert_control(
        &mut self,
        device_id: &str,
        update: &ControlUpdate,
        now: DateTime<Utc>,
    ) -> Result<ControlSettings, StoreError>;

    /// Ingestion-side conditional upsert of the setpoint: a provided value
    /// overwrites `desiredTemp`, an omitted value leaves an existing row
    /// untouched. An absent row is created with the defaults (setpoint
    /// 25.0 unless the device reported one).
    fn merge_desired_temp(
        &mut self,
        device_id: &str,
        desired_temp: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ControlSettings, StoreError>;

    /// Attach a device to a user. Idempotent; the relation is many-to-many.
    fn attach_device(&mut self, user_id: &str, device_id: &str) -> Result<(), StoreError>;

    /// Whether the user owns (or shares) the device.
    fn user_owns(&self, user_id: &str, device_id: &str) -> Result<bool, StoreError>;

    /// Device IDs attached to a user, in attachment order.
    fn devices_for(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory `DeviceStore` implementation.
///
/// State is lost on restart, matching the rate-limit windows and the
/// settings cache held alongside it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: HashMap<String, Vec<SensorReading>>,
    controls: HashMap<String, ControlSettings>,
    /// user id -> owned device ids, insertion-ordered.
    ownership: HashMap<String, Vec<String>>,
    /// (user id, device id) pairs for O(1) ownership checks.
    owned_pairs: HashSet<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored readings across all devices.
    pub fn reading_count(&self) -> usize {
        self.readings.values().map(Vec::len).sum()
    }
}

impl DeviceStore for MemoryStore {
    fn insert_reading(&mut self, reading: SensorReading) -> Result<(), StoreError> {
        self.readings
            .entry(reading.device_id.clone())
            .or_default()
            .push(reading);
        Ok(())
    }

    fn latest_reading(&self, device_id: &str) -> Result<Option<SensorReading>, StoreError> {
        Ok(self
            .readings
            .get(device_id)
            .and_then(|log| log.iter().max_by_key(|r| r.captured_at))
            .cloned())
    }

    fn readings_for(&self, device_id: &str) -> Result<Vec<SensorReading>, StoreError> {
        let mut log = self.readings.get(device_id).cloned().unwrap_or_default();
        log.sort_by_key(|r| r.captured_at);
        Ok(log)
    }

    fn control(&self, device_id: &str) -> Result<Option<ControlSettings>, StoreError> {
        Ok(self.controls.get(device_id).cloned())
    }

    fn upsert_control(
        &mut self,
        device_id: &str,
        update: &ControlUpdate,
        now: DateTime<Utc>,
    ) -> Result<ControlSettings, StoreError> {
        let row = self
            .controls
            .entry(device_id.to_string())
            .or_insert_with(|| ControlSettings::defaults(device_id, now));

        if let Some(desired) = update.desired_temp {
            row.desired_temp = desired;
        }
        if let Some(mode) = update.mode {
            row.mode = mode;
        }
        if let Some(power) = update.power {
            row.power = power;
        }
        row.updated_at = now;

        Ok(row.clone())
    }

    fn merge_desired_temp(
        &mut self,
        device_id: &str,
        desired_temp: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ControlSettings, StoreError> {
        let row = self
            .controls
            .entry(device_id.to_string())
            .or_insert_with(|| {
                let mut defaults = ControlSettings::defaults(device_id, now);
                defaults.desired_temp = desired_temp.unwrap_or(DEFAULT_DESIRED_TEMP);
                defaults
            });

        if let Some(desired) = desired_temp {
            row.desired_temp = desired;
            row.updated_at = now;
        }

        Ok(row.clone())
    }

    fn attach_device(&mut self, user_id: &str, device_id: &str) -> Result<(), StoreError> {
        let pair = (user_id.to_string(), device_id.to_string());
        if self.owned_pairs.insert(pair) {
            self.ownership
                .entry(user_id.to_string())
                .or_default()
                .push(device_id.to_string());
        }
        Ok(())
    }

    fn user_owns(&self, user_id: &str, device_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .owned_pairs
            .contains(&(user_id.to_string(), device_id.to_string())))
    }

    fn devices_for(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.ownership.get(user_id).cloned().unwrap_or_default())
    }
}
