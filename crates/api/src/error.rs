use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use faultwatch_core::error::CoreError;
use faultwatch_core::telemetry::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`StoreError`] and adds HTTP-specific variants.
/// Every variant renders the same JSON envelope:
///
/// ```text
/// {"error": "store_unavailable", "code": "STORE_UNAVAILABLE", "detail": "..."}
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `faultwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A telemetry or alert-state store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A write payload that could not be parsed or failed validation.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The route exists but not for this HTTP method.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, code, detail) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "no_data",
                    "NOT_FOUND",
                    format!("no {entity} found for {id}"),
                ),
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "VALIDATION_ERROR",
                    msg.clone(),
                ),
                CoreError::Unavailable(msg) => store_unavailable(msg),
                CoreError::Internal(msg) => internal(msg),
            },

            AppError::Store(store) => match store {
                StoreError::InvalidEvent(msg) => invalid_event(msg),
                StoreError::Unavailable(msg) => store_unavailable(msg),
            },

            AppError::InvalidEvent(msg) => invalid_event(msg),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "BAD_REQUEST",
                msg.clone(),
            ),
            AppError::MethodNotAllowed(method) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "METHOD_NOT_ALLOWED",
                format!("{method} is not supported on this route"),
            ),
        };

        let body = json!({
            "error": kind,
            "code": code,
            "detail": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn invalid_event(msg: &str) -> (StatusCode, &'static str, &'static str, String) {
    (
        StatusCode::BAD_REQUEST,
        "invalid_event",
        "INVALID_EVENT",
        msg.to_string(),
    )
}

/// The cause is logged; clients only learn that the store is down.
fn store_unavailable(msg: &str) -> (StatusCode, &'static str, &'static str, String) {
    tracing::warn!(error = %msg, "Telemetry store unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "store_unavailable",
        "STORE_UNAVAILABLE",
        "The telemetry store is temporarily unavailable".to_string(),
    )
}

fn internal(msg: &str) -> (StatusCode, &'static str, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
