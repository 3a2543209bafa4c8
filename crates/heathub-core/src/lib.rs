//! # heathub-core
//!
//! Core data model and device-state stores for the heathub backend.
//!
//! This crate provides:
//! - Data model types (SensorReading, ControlSettings, enums)
//! - The `DeviceStore` storage abstraction and its in-memory implementation
//! - Per-device rate limiters for telemetry intake
//! - The control-settings cache
//! - Time-bucketed history aggregation for charting
//!
//! This crate is intentionally runtime-agnostic and contains no async code.
//! Shared-state wrapping (`Arc`, locks) happens at the web layer.

pub mod cache;
pub mod history;
pub mod model;
pub mod ratelimit;
pub mod store;

pub use cache::SettingsCache;
pub use history::{aggregate, Granularity, HistoryBucket};
pub use model::*;
pub use ratelimit::{IntervalLimiter, RateLimitDecision, WindowLimiter};
pub use store::{DeviceStore, MemoryStore, StoreError};
