//! Policy Routes

use axum::{extract::State, Json};
use serde::Serialize;
use signal_policy::PolicySet;

use crate::error::ApiError;
use crate::SharedState;

/// Response for a policy reload
#[derive(Debug, Serialize)]
pub struct LoadPoliciesResponse {
    pub loaded: usize,
}

/// Active policy set
pub async fn get_policies(State(state): State<SharedState>) -> Json<PolicySet> {
    Json(state.engine.policies().as_ref().clone())
}

/// Replace the policy set; an invalid set leaves the active one untouched
pub async fn put_policies(
    State(state): State<SharedState>,
    Json(policies): Json<PolicySet>,
) -> Result<Json<LoadPoliciesResponse>, ApiError> {
    let loaded = policies.len();
    state.engine.load_policies(policies)?;
    Ok(Json(LoadPoliciesResponse { loaded }))
}
