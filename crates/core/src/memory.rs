//! In-process implementations of the store traits.
//!
//! Used for local development (`STORE_CONNECTION=memory`) and tests. State
//! lives only as long as the process, so it is not shared across instances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::alert::{AlertState, AlertStateStore, StateUpdate};
use crate::telemetry::{
    clamp_limit, next_recorded_at, validate_machine_id, MachineEvent, NewMachineEvent,
    StoreError, TelemetryStore,
};

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Append-only telemetry log keyed by machine id.
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    events: RwLock<HashMap<String, Vec<MachineEvent>>>,
    next_id: AtomicI64,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn append(&self, event: NewMachineEvent) -> Result<MachineEvent, StoreError> {
        event.validate()?;

        let mut events = self.events.write().await;
        let log = events.entry(event.machine_id.clone()).or_default();
        let recorded_at = next_recorded_at(log.last().map(|e| e.recorded_at), Utc::now());

        let stored = MachineEvent {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            machine_id: event.machine_id,
            temperature: event.temperature,
            vibration: event.vibration,
            extra_readings: event.extra_readings,
            recorded_at,
        };
        log.push(stored.clone());
        Ok(stored)
    }

    async fn query_latest(
        &self,
        machine_id: &str,
        limit: i64,
    ) -> Result<Vec<MachineEvent>, StoreError> {
        validate_machine_id(machine_id)?;
        let limit = usize::try_from(clamp_limit(limit)).unwrap_or(1);

        let events = self.events.read().await;
        Ok(events
            .get(machine_id)
            .map(|log| log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Alert state
// ---------------------------------------------------------------------------

/// Alert state map guarded by a single mutex, which makes every
/// compare-and-swap atomic.
#[derive(Debug, Default)]
pub struct InMemoryAlertStateStore {
    states: Mutex<HashMap<String, AlertState>>,
}

impl InMemoryAlertStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStateStore for InMemoryAlertStateStore {
    async fn get(&self, machine_id: &str) -> Result<Option<AlertState>, StoreError> {
        Ok(self.states.lock().await.get(machine_id).cloned())
    }

    async fn compare_and_swap(
        &self,
        machine_id: &str,
        expected_version: Option<i64>,
        update: &StateUpdate,
    ) -> Result<Option<AlertState>, StoreError> {
        let mut states = self.states.lock().await;
        let current_version = states.get(machine_id).map(|s| s.version);
        if current_version != expected_version {
            return Ok(None);
        }

        let next = AlertState {
            machine_id: machine_id.to_string(),
            last_status: update.last_status,
            last_alert_at: update.last_alert_at,
            version: current_version.map_or(1, |v| v + 1),
            updated_at: Utc::now(),
        };
        states.insert(machine_id.to_string(), next.clone());
        Ok(Some(next))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
