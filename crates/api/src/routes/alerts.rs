//! Alert Routes

use alerting::{Alert, AlertFilter, AlertStatus, AlertSummary};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use signal_policy::{SignalType, Tier};

use crate::error::ApiError;
use crate::SharedState;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub subject: Option<String>,
    pub signal: Option<String>,
    pub status: Option<AlertStatus>,
    /// Lowest severity to include
    pub severity: Option<Tier>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

impl AlertQuery {
    fn filter(&self) -> AlertFilter {
        let mut filter = AlertFilter::new();
        if let Some(subject) = &self.subject {
            filter = filter.subject(subject.clone());
        }
        if let Some(signal) = &self.signal {
            filter = filter.signal(SignalType::from(signal.as_str()));
        }
        if let Some(status) = self.status {
            filter = filter.status(status);
        }
        if let Some(severity) = self.severity {
            filter = filter.severity_min(severity);
        }
        filter
    }
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<Alert>,
    pub count: usize,
    /// Matches before the limit was applied
    pub total: usize,
}

/// Alerts in triage order (severity, then most recent)
pub async fn get_alerts(
    State(state): State<SharedState>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let limit = params.limit.min(500);
    let mut data = state.engine.list_alerts(&params.filter());
    let total = data.len();
    data.truncate(limit);

    Json(AlertResponse {
        count: data.len(),
        total,
        data,
    })
}

pub async fn get_summary(State(state): State<SharedState>) -> Json<AlertSummary> {
    Json(state.engine.alert_summary())
}

pub async fn get_alert(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    state
        .engine
        .get_alert(&alert_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Alert not found: {}", alert_id)))
}

/// Request body for a manual status change
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AlertStatus,
    pub note: Option<String>,
}

pub async fn set_status(
    State(state): State<SharedState>,
    Path(alert_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state
        .engine
        .set_alert_status(&alert_id, request.status, request.note)?;
    Ok(Json(alert))
}
