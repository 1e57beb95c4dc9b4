//! Postgres-backed implementations of the core store traits.
//!
//! Every call runs under a per-call timeout. Connectivity failures and
//! timeouts surface as [`StoreError::Unavailable`]; check-constraint
//! violations surface as [`StoreError::InvalidEvent`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use faultwatch_core::alert::{AlertState, AlertStateStore, StateUpdate};
use faultwatch_core::telemetry::{
    clamp_limit, validate_machine_id, MachineEvent, NewMachineEvent, StoreError, TelemetryStore,
};

use crate::models::alert_state::AlertStateRow;
use crate::repositories::{AlertStateRepo, MachineEventRepo};
use crate::DbPool;

/// PostgreSQL SQLSTATE for a CHECK constraint violation.
const CHECK_VIOLATION: &str = "23514";

/// Default bound for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run a query future under `timeout`, translating failures.
async fn bounded<T, F>(timeout: Duration, op: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(classify(op, err)),
        Err(_) => {
            tracing::error!(op, timeout_ms = timeout.as_millis() as u64, "Store call timed out");
            Err(StoreError::Unavailable(format!(
                "{op} timed out after {timeout:?}"
            )))
        }
    }
}

fn classify(op: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(CHECK_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return StoreError::InvalidEvent(format!("violates constraint {constraint}"));
        }
    }
    tracing::error!(op, error = %err, "Store call failed");
    StoreError::Unavailable(format!("{op} failed"))
}

fn into_state(row: AlertStateRow) -> Result<AlertState, StoreError> {
    AlertState::try_from(row).map_err(|e| {
        tracing::error!(error = %e, "Corrupt alert state row");
        StoreError::Unavailable(e.to_string())
    })
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// [`TelemetryStore`] over the `machine_events` table.
#[derive(Clone)]
pub struct PgTelemetryStore {
    pool: DbPool,
    timeout: Duration,
}

impl PgTelemetryStore {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn append(&self, event: NewMachineEvent) -> Result<MachineEvent, StoreError> {
        event.validate()?;
        let row = bounded(
            self.timeout,
            "machine_events.insert",
            MachineEventRepo::insert(&self.pool, &event),
        )
        .await?;
        Ok(row.into())
    }

    async fn query_latest(
        &self,
        machine_id: &str,
        limit: i64,
    ) -> Result<Vec<MachineEvent>, StoreError> {
        validate_machine_id(machine_id)?;
        let rows = bounded(
            self.timeout,
            "machine_events.list_latest",
            MachineEventRepo::list_latest(&self.pool, machine_id, clamp_limit(limit)),
        )
        .await?;
        Ok(rows.into_iter().map(MachineEvent::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        bounded(self.timeout, "health_check", crate::health_check(&self.pool)).await
    }
}

// ---------------------------------------------------------------------------
// Alert state
// ---------------------------------------------------------------------------

/// [`AlertStateStore`] over the `alert_states` table, using a version
/// column for compare-and-swap.
#[derive(Clone)]
pub struct PgAlertStateStore {
    pool: DbPool,
    timeout: Duration,
}

impl PgAlertStateStore {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl AlertStateStore for PgAlertStateStore {
    async fn get(&self, machine_id: &str) -> Result<Option<AlertState>, StoreError> {
        bounded(
            self.timeout,
            "alert_states.find",
            AlertStateRepo::find(&self.pool, machine_id),
        )
        .await?
        .map(into_state)
        .transpose()
    }

    async fn compare_and_swap(
        &self,
        machine_id: &str,
        expected_version: Option<i64>,
        update: &StateUpdate,
    ) -> Result<Option<AlertState>, StoreError> {
        let status_id = update.last_status.id();
        let row = match expected_version {
            None => {
                bounded(
                    self.timeout,
                    "alert_states.insert_if_absent",
                    AlertStateRepo::insert_if_absent(
                        &self.pool,
                        machine_id,
                        status_id,
                        update.last_alert_at,
                    ),
                )
                .await?
            }
            Some(version) => {
                bounded(
                    self.timeout,
                    "alert_states.update_if_version",
                    AlertStateRepo::update_if_version(
                        &self.pool,
                        machine_id,
                        version,
                        status_id,
                        update.last_alert_at,
                    ),
                )
                .await?
            }
        };
        row.map(into_state).transpose()
    }
}
