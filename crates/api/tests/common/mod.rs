//! Shared helpers for API integration tests.
//!
//! Every test app runs on the in-memory stores and a recording notifier, so
//! these tests need no database or network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use faultwatch_api::config::ServerConfig;
use faultwatch_api::engine::FaultDispatcher;
use faultwatch_api::router::build_app_router;
use faultwatch_api::state::AppState;
use faultwatch_core::alert::{AlertGate, AlertPolicy};
use faultwatch_core::memory::{InMemoryAlertStateStore, InMemoryTelemetryStore};
use faultwatch_core::notifier::{AlertMessage, Notifier, NotifierError};
use faultwatch_core::prediction::ThresholdPredictor;
use faultwatch_core::telemetry::{MachineEvent, NewMachineEvent, StoreError, TelemetryStore};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_prefix: String::new(),
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
    }
}

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Notifier that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AlertMessage>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            Err(NotifierError::Rejected(503))
        } else {
            Ok(())
        }
    }
}

/// Telemetry store whose every call reports the backend as unreachable.
pub struct UnavailableStore;

#[async_trait]
impl TelemetryStore for UnavailableStore {
    async fn append(&self, _event: NewMachineEvent) -> Result<MachineEvent, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn query_latest(
        &self,
        _machine_id: &str,
        _limit: i64,
    ) -> Result<Vec<MachineEvent>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
}

/// Build an app over the given store, notifier and server config, using the
/// same router builder as `main.rs`.
pub fn build_app(
    store: Arc<dyn TelemetryStore>,
    notifier: Arc<RecordingNotifier>,
    config: ServerConfig,
) -> TestApp {
    let gate = AlertGate::new(
        Arc::new(InMemoryAlertStateStore::new()),
        AlertPolicy::new(Duration::from_secs(300)),
    );
    let dispatcher = FaultDispatcher::new(
        store,
        Arc::new(ThresholdPredictor::default()),
        gate,
        notifier.clone(),
    )
    .with_notifier_timeout(Duration::from_secs(2));

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };

    TestApp {
        router: build_app_router(state, &config),
        notifier,
    }
}

/// In-memory app with a succeeding notifier.
pub fn build_test_app() -> TestApp {
    build_app(
        Arc::new(InMemoryTelemetryStore::new()),
        Arc::new(RecordingNotifier::default()),
        test_config(),
    )
}

/// In-memory app whose notifier rejects every alert.
pub fn build_test_app_with_failing_notifier() -> TestApp {
    build_app(
        Arc::new(InMemoryTelemetryStore::new()),
        Arc::new(RecordingNotifier::failing()),
        test_config(),
    )
}

/// App whose telemetry store is down.
pub fn build_unavailable_app() -> TestApp {
    build_app(
        Arc::new(UnavailableStore),
        Arc::new(RecordingNotifier::default()),
        test_config(),
    )
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&json).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a request with an arbitrary method and raw body.
pub async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
