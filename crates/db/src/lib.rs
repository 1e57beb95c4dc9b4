//! Postgres persistence for telemetry and alert state.
//!
//! - [`models`] — `FromRow` row structs and their domain conversions.
//! - [`repositories`] — zero-sized repos with async query methods.
//! - [`store`] — implementations of the core store traits on top of the
//!   repositories, with per-call timeouts.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use store::{PgAlertStateStore, PgTelemetryStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
///
/// `acquire_timeout` bounds how long a caller waits for a free connection,
/// so an exhausted or unreachable database fails fast.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
