//! Trend Routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use signal_policy::{SignalType, Trend};

use crate::SharedState;

/// Trend for one (subject, signal type)
#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub subject_id: String,
    pub signal_type: SignalType,
    pub trend: Trend,
    /// Retained values, newest last
    pub history: Vec<f64>,
    /// Readings recorded in total, including ones no longer retained
    pub observations: usize,
}

pub async fn get_trend(
    State(state): State<SharedState>,
    Path((subject_id, signal)): Path<(String, String)>,
) -> Json<TrendResponse> {
    let signal_type = SignalType::from(signal.as_str());
    Json(TrendResponse {
        trend: state.engine.get_trend(&subject_id, &signal_type),
        history: state.engine.trend_history(&subject_id, &signal_type),
        observations: state.engine.trend_observations(&subject_id, &signal_type),
        subject_id,
        signal_type,
    })
}
