//! API Error Types

use alerting::AlertError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use monitor::EngineError;
use serde::Serialize;
use thiserror::Error;

/// Handler errors, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        match e {
            AlertError::NotFound(_) => ApiError::NotFound(e.to_string()),
            AlertError::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidPolicies(_) => ApiError::BadRequest(e.to_string()),
            EngineError::Alert(alert) => alert.into(),
            EngineError::QueueClosed | EngineError::QueueFull => {
                ApiError::Unavailable(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Startup and shutdown failures of the server process
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Metrics recorder error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Monitoring loop failed: {0}")]
    Monitor(#[from] tokio::task::JoinError),
}
