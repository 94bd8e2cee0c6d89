use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cricket_types::errors::ScoringError;
use serde_json::json;
use thiserror::Error;

use crate::hub::SubscribeError;
use crate::replay::ReplayError;

/// Central error type for the HTTP edge
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<SubscribeError> for AppError {
    fn from(err: SubscribeError) -> Self {
        match err {
            SubscribeError::Scoring(e) => AppError::Scoring(e),
            e @ SubscribeError::TooManySubscribers { .. } => AppError::ServiceUnavailable(e.to_string()),
        }
    }
}

/// HTTP status for a scoring rejection.
fn scoring_status(err: &ScoringError) -> StatusCode {
    match err {
        ScoringError::MatchNotFound { .. }
        | ScoringError::InningsNotFound { .. }
        | ScoringError::DeliveryNotFound { .. } => StatusCode::NOT_FOUND,
        ScoringError::InningsClosed { .. }
        | ScoringError::InvalidMatchState { .. }
        | ScoringError::CorrectionInvalidatesClosure { .. } => StatusCode::CONFLICT,
        ScoringError::InvalidPlayers { .. }
        | ScoringError::OverOverrun { .. }
        | ScoringError::DuplicateDismissal { .. }
        | ScoringError::IncomingBatterRequired { .. }
        | ScoringError::InvalidDelivery { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AppError::Scoring(e) => (scoring_status(&e), e.to_string(), e.code()),
            AppError::Replay(ReplayError::InningsNotFound { innings_id }) => (
                StatusCode::NOT_FOUND,
                format!("Innings not found: {}", innings_id),
                "ERR_NOT_FOUND",
            ),
            AppError::Replay(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), "ERR_REPLAY_MISMATCH"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, "SERVICE_UNAVAILABLE"),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "INTERNAL_ERROR",
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
