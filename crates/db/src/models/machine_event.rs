//! Row model for the `machine_events` table (append-only).

use std::collections::BTreeMap;

use faultwatch_core::telemetry::MachineEvent;
use faultwatch_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A single stored telemetry sample.
#[derive(Debug, Clone, FromRow)]
pub struct MachineEventRow {
    pub id: DbId,
    pub machine_id: String,
    pub temperature: f64,
    pub vibration: f64,
    pub extra_readings: Json<BTreeMap<String, f64>>,
    pub recorded_at: Timestamp,
    pub created_at: Timestamp,
}

impl From<MachineEventRow> for MachineEvent {
    fn from(row: MachineEventRow) -> Self {
        MachineEvent {
            id: row.id,
            machine_id: row.machine_id,
            temperature: row.temperature,
            vibration: row.vibration,
            extra_readings: row.extra_readings.0,
            recorded_at: row.recorded_at,
        }
    }
}
