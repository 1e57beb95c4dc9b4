use std::sync::Arc;

use crate::engine::FaultDispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Telemetry, prediction and alerting pipeline.
    pub dispatcher: Arc<FaultDispatcher>,
}
