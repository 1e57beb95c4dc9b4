//! Repository for the `alert_states` table.
//!
//! Writes are conditional: an insert only succeeds when no row exists and an
//! update only succeeds when the caller's `version` is still current. A
//! `None` result means another writer won the race.

use faultwatch_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::alert_state::AlertStateRow;

/// Column list for `alert_states` queries.
const COLUMNS: &str = "\
    machine_id, last_status_id, last_alert_at, version, created_at, updated_at";

/// Provides query operations for per-machine alert state.
pub struct AlertStateRepo;

impl AlertStateRepo {
    /// Find the alert state for a machine.
    pub async fn find(
        pool: &PgPool,
        machine_id: &str,
    ) -> Result<Option<AlertStateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alert_states WHERE machine_id = $1");
        sqlx::query_as::<_, AlertStateRow>(&query)
            .bind(machine_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the first state row for a machine unless one already exists.
    pub async fn insert_if_absent(
        pool: &PgPool,
        machine_id: &str,
        last_status_id: i16,
        last_alert_at: Option<Timestamp>,
    ) -> Result<Option<AlertStateRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_states (machine_id, last_status_id, last_alert_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (machine_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertStateRow>(&query)
            .bind(machine_id)
            .bind(last_status_id)
            .bind(last_alert_at)
            .fetch_optional(pool)
            .await
    }

    /// Update the state row only if it is still at `expected_version`.
    pub async fn update_if_version(
        pool: &PgPool,
        machine_id: &str,
        expected_version: i64,
        last_status_id: i16,
        last_alert_at: Option<Timestamp>,
    ) -> Result<Option<AlertStateRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alert_states SET \
                last_status_id = $3, \
                last_alert_at = $4, \
                version = version + 1, \
                updated_at = NOW() \
             WHERE machine_id = $1 AND version = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertStateRow>(&query)
            .bind(machine_id)
            .bind(expected_version)
            .bind(last_status_id)
            .bind(last_alert_at)
            .fetch_optional(pool)
            .await
    }
}
