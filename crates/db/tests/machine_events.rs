//! Integration tests for telemetry persistence.
//!
//! Require a PostgreSQL instance reachable through `DATABASE_URL`; run with
//! `cargo test -p faultwatch-db -- --ignored`.

use assert_matches::assert_matches;
use faultwatch_core::telemetry::{NewMachineEvent, StoreError, TelemetryStore};
use faultwatch_db::repositories::MachineEventRepo;
use faultwatch_db::store::DEFAULT_STORE_TIMEOUT;
use faultwatch_db::PgTelemetryStore;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn prediction_statuses_are_seeded(pool: PgPool) {
    let names: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM prediction_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(
        names,
        vec![
            (1, "NORMAL".to_string()),
            (2, "FAULT_SOON".to_string()),
            (3, "FAULT".to_string()),
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn appended_event_is_latest(pool: PgPool) {
    let store = PgTelemetryStore::new(pool, DEFAULT_STORE_TIMEOUT);

    store
        .append(NewMachineEvent::new("M-202", 67.0, 1.4))
        .await
        .unwrap();
    let second = store
        .append(NewMachineEvent::new("M-202", 95.0, 4.0).with_reading("pressure", 2.5))
        .await
        .unwrap();

    let latest = store.query_latest("M-202", 10).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0], second);
    assert_eq!(latest[0].extra_readings.get("pressure"), Some(&2.5));
    assert!(latest[0].recorded_at >= latest[1].recorded_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_latest_respects_limit_and_machine(pool: PgPool) {
    for i in 0..4 {
        let event = NewMachineEvent::new("M-1", 60.0 + f64::from(i), 1.0);
        MachineEventRepo::insert(&pool, &event).await.unwrap();
    }
    MachineEventRepo::insert(&pool, &NewMachineEvent::new("M-2", 99.0, 9.0))
        .await
        .unwrap();

    let rows = MachineEventRepo::list_latest(&pool, "M-1", 2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].temperature, 63.0);
    assert_eq!(rows[1].temperature, 62.0);
    assert!(rows.iter().all(|r| r.machine_id == "M-1"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unknown_machine_returns_empty(pool: PgPool) {
    let store = PgTelemetryStore::new(pool, DEFAULT_STORE_TIMEOUT);
    assert!(store.query_latest("ghost", 10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn invalid_event_is_rejected_before_insert(pool: PgPool) {
    let store = PgTelemetryStore::new(pool.clone(), DEFAULT_STORE_TIMEOUT);
    let result = store.append(NewMachineEvent::new("", 60.0, 1.0)).await;
    assert_matches!(result, Err(StoreError::InvalidEvent(_)));

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM machine_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}
