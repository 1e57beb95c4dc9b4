//! Repository for the `machine_events` table (append-only time-series).

use faultwatch_core::telemetry::NewMachineEvent;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::machine_event::MachineEventRow;

/// Column list for `machine_events` SELECT queries.
const COLUMNS: &str = "\
    id, machine_id, temperature, vibration, extra_readings, \
    recorded_at, created_at";

/// Provides query operations for machine telemetry.
pub struct MachineEventRepo;

impl MachineEventRepo {
    /// Insert a single sample.
    ///
    /// `recorded_at` is taken from the database clock but never set earlier
    /// than the machine's current latest sample, so per-machine timestamps
    /// are non-decreasing in insertion order.
    pub async fn insert(
        pool: &PgPool,
        event: &NewMachineEvent,
    ) -> Result<MachineEventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO machine_events \
                (machine_id, temperature, vibration, extra_readings, recorded_at) \
             SELECT $1, $2, $3, $4, \
                GREATEST(clock_timestamp(), COALESCE(MAX(recorded_at), clock_timestamp())) \
             FROM machine_events WHERE machine_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MachineEventRow>(&query)
            .bind(&event.machine_id)
            .bind(event.temperature)
            .bind(event.vibration)
            .bind(Json(&event.extra_readings))
            .fetch_one(pool)
            .await
    }

    /// Latest samples for a machine, newest first.
    pub async fn list_latest(
        pool: &PgPool,
        machine_id: &str,
        limit: i64,
    ) -> Result<Vec<MachineEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM machine_events \
             WHERE machine_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, MachineEventRow>(&query)
            .bind(machine_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
