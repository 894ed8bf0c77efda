//! Posture Routes

use axum::{
    extract::{Path, State},
    Json,
};
use posture::SubjectPosture;
use serde::Serialize;

use crate::SharedState;

/// Response for the posture listing
#[derive(Debug, Serialize)]
pub struct PostureListResponse {
    pub data: Vec<SubjectPosture>,
    pub count: usize,
}

/// Postures of every reporting subject
pub async fn list_postures(State(state): State<SharedState>) -> Json<PostureListResponse> {
    let data: Vec<SubjectPosture> = state
        .engine
        .subjects()
        .iter()
        .map(|subject| state.engine.get_posture(subject))
        .collect();

    Json(PostureListResponse {
        count: data.len(),
        data,
    })
}

/// Posture of one subject (`unknown` if it has never reported)
pub async fn get_posture(
    State(state): State<SharedState>,
    Path(subject_id): Path<String>,
) -> Json<SubjectPosture> {
    Json(state.engine.get_posture(&subject_id))
}
