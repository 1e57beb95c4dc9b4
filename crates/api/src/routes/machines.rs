//! Route definitions for machine telemetry endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::machines;
use crate::state::AppState;

/// Machine routes, mounted at the root or under `API_PREFIX`.
///
/// ```text
/// POST /machines                        -> record_event
/// GET  /machines?machine_id=            -> get_machine_status
/// GET  /machines/{machine_id}/events    -> list_machine_events
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/machines",
            get(machines::get_machine_status)
                .post(machines::record_event)
                .fallback(machines::method_not_allowed),
        )
        .route(
            "/machines/{machine_id}/events",
            get(machines::list_machine_events).fallback(machines::method_not_allowed),
        )
}
