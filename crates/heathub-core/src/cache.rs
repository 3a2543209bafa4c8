//! In-memory mirror of the control-state store.
//!
//! A best-effort performance layer for high-frequency device polling: the
//! store stays authoritative and entries live until explicitly invalidated.
//! Write-through ordering (store first, cache after the durable commit) is
//! the caller's responsibility.

use std::collections::HashMap;

use crate::model::ControlSettings;

/// Key-value cache of per-device control settings with explicit
/// get/put/invalidate operations. No expiration policy.
#[derive(Debug, Default)]
pub struct SettingsCache {
    entries: HashMap<String, ControlSettings>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device_id: &str) -> Option<ControlSettings> {
        self.entries.get(device_id).cloned()
    }

    /// Last write wins; callers only put settings the store has committed
    /// (or the documented defaults for a device the store does not know).
    pub fn put(&mut self, settings: ControlSettings) {
        self.entries.insert(settings.device_id.clone(), settings);
    }

    pub fn invalidate(&mut self, device_id: &str) {
        self.entries.remove(device_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
