//! Integration tests for compare-and-swap alert state.
//!
//! Require a PostgreSQL instance reachable through `DATABASE_URL`; run with
//! `cargo test -p faultwatch-db -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use faultwatch_core::alert::{AlertDecision, AlertGate, AlertPolicy, AlertStateStore, StateUpdate};
use faultwatch_core::prediction::PredictionStatus;
use faultwatch_db::store::DEFAULT_STORE_TIMEOUT;
use faultwatch_db::PgAlertStateStore;
use sqlx::PgPool;

fn fault_update() -> StateUpdate {
    StateUpdate {
        last_status: PredictionStatus::Fault,
        last_alert_at: Some(Utc::now()),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insert_if_absent_only_once(pool: PgPool) {
    let store = PgAlertStateStore::new(pool, DEFAULT_STORE_TIMEOUT);

    let created = store
        .compare_and_swap("M-1", None, &fault_update())
        .await
        .unwrap()
        .expect("first insert wins");
    assert_eq!(created.version, 1);
    assert_eq!(created.last_status, PredictionStatus::Fault);

    let second = store
        .compare_and_swap("M-1", None, &fault_update())
        .await
        .unwrap();
    assert!(second.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_requires_current_version(pool: PgPool) {
    let store = PgAlertStateStore::new(pool, DEFAULT_STORE_TIMEOUT);
    store
        .compare_and_swap("M-1", None, &fault_update())
        .await
        .unwrap();

    let cleared = StateUpdate {
        last_status: PredictionStatus::Normal,
        last_alert_at: None,
    };
    let bumped = store
        .compare_and_swap("M-1", Some(1), &cleared)
        .await
        .unwrap()
        .expect("version 1 is current");
    assert_eq!(bumped.version, 2);
    assert_eq!(bumped.last_alert_at, None);

    let stale = store
        .compare_and_swap("M-1", Some(1), &cleared)
        .await
        .unwrap();
    assert!(stale.is_none());

    let stored = store.get("M-1").await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.last_status, PredictionStatus::Normal);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn gate_fires_once_across_concurrent_readers(pool: PgPool) {
    let store = Arc::new(PgAlertStateStore::new(pool, DEFAULT_STORE_TIMEOUT));
    let gate = Arc::new(AlertGate::new(
        store,
        AlertPolicy::new(Duration::from_secs(300)),
    ));
    let now = Utc::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                gate.decide("M-race", PredictionStatus::Fault, now)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut fires = 0;
    for handle in handles {
        if handle.await.unwrap() == AlertDecision::Fire {
            fires += 1;
        }
    }
    assert_eq!(fires, 1);

    let later = gate
        .decide("M-race", PredictionStatus::Fault, now + TimeDelta::seconds(301))
        .await
        .unwrap();
    assert_eq!(later, AlertDecision::Fire);
}
