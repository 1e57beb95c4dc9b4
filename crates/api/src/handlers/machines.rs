//! Handlers for machine telemetry endpoints.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::Json;
use faultwatch_core::telemetry::{
    validate_machine_id, MachineEvent, NewMachineEvent, MAX_MACHINE_ID_LEN,
};
use faultwatch_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::MachineStatusReport;
use crate::error::{AppError, AppResult};
use crate::query::{HistoryParams, MachineQuery};
use crate::response::DataResponse;
use crate::state::AppState;

/// Page size for the history listing when `limit` is omitted.
const DEFAULT_HISTORY_PAGE: i64 = 50;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for recording a telemetry sample.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordEventRequest {
    #[validate(length(min = 1, max = 128))]
    pub machine_id: String,
    pub temperature: f64,
    pub vibration: f64,
    #[serde(default)]
    pub extra_readings: BTreeMap<String, f64>,
    /// Any other top-level numeric field is an additional sensor reading.
    #[serde(flatten)]
    pub readings: BTreeMap<String, f64>,
}

impl From<RecordEventRequest> for NewMachineEvent {
    fn from(req: RecordEventRequest) -> Self {
        let mut extra_readings = req.extra_readings;
        extra_readings.extend(req.readings);
        Self {
            machine_id: req.machine_id.trim().to_string(),
            temperature: req.temperature,
            vibration: req.vibration,
            extra_readings,
        }
    }
}

/// Acknowledgement for a stored sample.
#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    pub stored: bool,
    pub machine_id: String,
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /machines
///
/// Store one sample. Malformed bodies map to `400 invalid_event`.
pub async fn record_event(
    State(state): State<AppState>,
    payload: Result<Json<RecordEventRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RecordEventResponse>)> {
    let Json(input) = payload.map_err(|rejection| AppError::InvalidEvent(rejection.body_text()))?;
    input
        .validate()
        .map_err(|e| AppError::InvalidEvent(e.to_string()))?;

    let stored = state.dispatcher.record(input.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordEventResponse {
            stored: true,
            machine_id: stored.machine_id,
            recorded_at: stored.recorded_at,
        }),
    ))
}

/// GET /machines?machine_id=
///
/// Current fault status of a machine, alerting if the gate fires.
pub async fn get_machine_status(
    State(state): State<AppState>,
    query: Result<Query<MachineQuery>, QueryRejection>,
) -> AppResult<Json<MachineStatusReport>> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let machine_id = required_machine_id(query.machine_id)?;
    let report = state.dispatcher.inspect(&machine_id).await?;
    Ok(Json(report))
}

/// GET /machines/{machine_id}/events?limit=
///
/// Recent samples for a machine, newest first. No prediction.
pub async fn list_machine_events(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> AppResult<Json<DataResponse<Vec<MachineEvent>>>> {
    let Query(params) = params.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let machine_id = required_machine_id(Some(machine_id))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_PAGE);
    let events = state.dispatcher.history(&machine_id, limit).await?;
    Ok(Json(DataResponse { data: events }))
}

/// Fallback for unsupported verbs on `/machines`.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

fn required_machine_id(raw: Option<String>) -> AppResult<String> {
    let machine_id = raw
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("machine_id is required".to_string()))?;
    validate_machine_id(&machine_id).map_err(|_| {
        AppError::BadRequest(format!(
            "machine_id must be at most {} characters",
            MAX_MACHINE_ID_LEN
        ))
    })?;
    Ok(machine_id)
}
