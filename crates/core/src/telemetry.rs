//! Machine telemetry samples and the telemetry store contract.
//!
//! A [`MachineEvent`] is immutable once stored. The store is append-only and
//! answers "latest N samples for this machine", newest first.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Longest accepted machine identifier.
pub const MAX_MACHINE_ID_LEN: usize = 128;

/// Upper bound for `query_latest` page sizes.
pub const MAX_QUERY_LIMIT: i64 = 500;

/// Sensor names reserved for the first-class reading columns.
const RESERVED_READINGS: [&str; 2] = ["temperature", "vibration"];

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A stored telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineEvent {
    pub id: DbId,
    pub machine_id: String,
    pub temperature: f64,
    pub vibration: f64,
    /// Any additional named sensor readings sent with the sample.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_readings: BTreeMap<String, f64>,
    pub recorded_at: Timestamp,
}

impl MachineEvent {
    /// Flatten all readings into a single JSON object.
    ///
    /// ```text
    /// {"temperature": 95.0, "vibration": 4.0, "pressure": 1.2}
    /// ```
    pub fn readings(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("temperature".into(), self.temperature.into());
        map.insert("vibration".into(), self.vibration.into());
        for (name, value) in &self.extra_readings {
            map.insert(name.clone(), (*value).into());
        }
        serde_json::Value::Object(map)
    }
}

/// A sample submitted for storage (no id or timestamp yet).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewMachineEvent {
    pub machine_id: String,
    pub temperature: f64,
    pub vibration: f64,
    #[serde(default)]
    pub extra_readings: BTreeMap<String, f64>,
}

impl NewMachineEvent {
    pub fn new(machine_id: impl Into<String>, temperature: f64, vibration: f64) -> Self {
        Self {
            machine_id: machine_id.into(),
            temperature,
            vibration,
            extra_readings: BTreeMap::new(),
        }
    }

    /// Attach an additional sensor reading.
    pub fn with_reading(mut self, name: impl Into<String>, value: f64) -> Self {
        self.extra_readings.insert(name.into(), value);
        self
    }

    /// Check the sample before it reaches the store.
    ///
    /// Rejects blank or oversized machine ids, non-finite readings and extra
    /// readings that shadow the first-class columns.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_machine_id(&self.machine_id)?;
        validate_finite(self.temperature, "temperature")?;
        validate_finite(self.vibration, "vibration")?;

        for (name, value) in &self.extra_readings {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidEvent(
                    "extra reading names must not be empty".to_string(),
                ));
            }
            if RESERVED_READINGS.contains(&name.as_str()) {
                return Err(StoreError::InvalidEvent(format!(
                    "extra reading '{name}' collides with a built-in sensor field"
                )));
            }
            validate_finite(*value, name)?;
        }
        Ok(())
    }
}

/// Validate a machine identifier as used on both the write and read paths.
pub fn validate_machine_id(machine_id: &str) -> Result<(), StoreError> {
    if machine_id.trim().is_empty() {
        return Err(StoreError::InvalidEvent(
            "machine_id must not be empty".to_string(),
        ));
    }
    if machine_id.trim() != machine_id {
        return Err(StoreError::InvalidEvent(
            "machine_id must not have leading or trailing whitespace".to_string(),
        ));
    }
    if machine_id.chars().count() > MAX_MACHINE_ID_LEN {
        return Err(StoreError::InvalidEvent(format!(
            "machine_id must be at most {MAX_MACHINE_ID_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_finite(value: f64, name: &str) -> Result<(), StoreError> {
    if !value.is_finite() {
        return Err(StoreError::InvalidEvent(format!(
            "{name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Clamp a caller-supplied page size into `[1, MAX_QUERY_LIMIT]`.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_QUERY_LIMIT)
}

/// Timestamp for a new sample, never earlier than the machine's latest one.
pub fn next_recorded_at(previous: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Failures surfaced by the telemetry and alert-state stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The sample was malformed.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The backing store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidEvent(msg) => CoreError::Validation(msg),
            StoreError::Unavailable(msg) => CoreError::Unavailable(msg),
        }
    }
}

/// Durable append-only log of machine readings.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Validate and persist a sample. The stored event is visible to every
    /// subsequent `query_latest` as soon as this returns.
    async fn append(&self, event: NewMachineEvent) -> Result<MachineEvent, StoreError>;

    /// Latest samples for a machine, newest first, at most `limit` long.
    /// Unknown machines yield an empty vector.
    async fn query_latest(
        &self,
        machine_id: &str,
        limit: i64,
    ) -> Result<Vec<MachineEvent>, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
