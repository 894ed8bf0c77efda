//! Diagnostic Routes

use axum::{extract::State, Json};
use monitor::Diagnostic;
use serde::Serialize;
use signal_policy::SignalType;

use crate::SharedState;

/// Recent processing problems
#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    /// Signal types seen without a policy
    pub config_gaps: Vec<SignalType>,
    /// Latest completed cycle
    pub last_cycle: Option<u64>,
    /// Most recent diagnostics, newest last
    pub recent: Vec<Diagnostic>,
}

pub async fn get_diagnostics(State(state): State<SharedState>) -> Json<DiagnosticsResponse> {
    let log = state.reports.read().await;
    Json(DiagnosticsResponse {
        config_gaps: state.engine.config_gaps(),
        last_cycle: log.last_cycle,
        recent: log.diagnostics.iter().cloned().collect(),
    })
}
