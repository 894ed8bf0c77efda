//! Reading Routes

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use signal_policy::Reading;
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;

/// Request body for reading submission
#[derive(Debug, Deserialize)]
pub struct SubmitReadingsRequest {
    pub readings: Vec<Reading>,
}

/// Response for reading submission
#[derive(Debug, Serialize)]
pub struct SubmitReadingsResponse {
    pub accepted: usize,
}

/// Queue readings for the monitoring loop
pub async fn submit_readings(
    State(state): State<SharedState>,
    Json(request): Json<SubmitReadingsRequest>,
) -> Result<(StatusCode, Json<SubmitReadingsResponse>), ApiError> {
    if request.readings.is_empty() {
        return Err(ApiError::BadRequest("No readings submitted".to_string()));
    }

    let accepted = request.readings.len();
    state.submitter.try_submit_readings(request.readings)?;
    metrics::counter!("risk_readings_submitted_total").increment(accepted as u64);
    debug!("Queued {} readings", accepted);

    Ok((StatusCode::ACCEPTED, Json(SubmitReadingsResponse { accepted })))
}
