//! Row model for the `alert_states` table.

use faultwatch_core::alert::AlertState;
use faultwatch_core::error::CoreError;
use faultwatch_core::prediction::PredictionStatus;
use faultwatch_core::types::Timestamp;
use sqlx::FromRow;

/// Per-machine alert bookkeeping row.
#[derive(Debug, Clone, FromRow)]
pub struct AlertStateRow {
    pub machine_id: String,
    /// FK to `prediction_statuses.id`.
    pub last_status_id: i16,
    pub last_alert_at: Option<Timestamp>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AlertStateRow> for AlertState {
    type Error = CoreError;

    fn try_from(row: AlertStateRow) -> Result<Self, Self::Error> {
        Ok(AlertState {
            last_status: PredictionStatus::from_id(row.last_status_id)?,
            machine_id: row.machine_id,
            last_alert_at: row.last_alert_at,
            version: row.version,
            updated_at: row.updated_at,
        })
    }
}
