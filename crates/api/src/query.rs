//! Query parameter types shared by the machine handlers.

use serde::Deserialize;

/// `?machine_id=` on the status read.
#[derive(Debug, Deserialize)]
pub struct MachineQuery {
    pub machine_id: Option<String>,
}

/// `?limit=` on the history listing. Clamped by the store.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}
