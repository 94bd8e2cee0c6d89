use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cricket_types::fixture::Toss;
use cricket_types::ids::MatchId;

use crate::api::error::AppError;
use crate::api::models::{CreateMatchRequest, InningsResponse, MatchResponse, OpenInningsRequest};
use crate::api::state::AppState;

pub async fn create_match(
    State(state): State<AppState>,
    Json(payload): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), AppError> {
    let record = state.engine.create_match(payload.into())?;
    Ok((StatusCode::CREATED, Json(MatchResponse::from_record(&record, None))))
}

pub async fn record_toss(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(toss): Json<Toss>,
) -> Result<Json<MatchResponse>, AppError> {
    let record = state.engine.record_toss(match_id, toss).await?;
    Ok(Json(MatchResponse::from_record(&record, None)))
}

/// Opens the next innings; the body is optional.
pub async fn open_innings(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    body: Bytes,
) -> Result<(StatusCode, Json<InningsResponse>), AppError> {
    let request: OpenInningsRequest = if body.is_empty() {
        OpenInningsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };
    let snapshot = state
        .engine
        .open_innings(match_id, request.enforce_follow_on)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

pub async fn conclude_draw(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchResponse>, AppError> {
    let view = state.engine.conclude_draw(match_id).await?;
    Ok(Json(view.into()))
}

/// Drops a completed match from memory and returns its final record.
pub async fn release_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchResponse>, AppError> {
    let record = state.engine.release_match(match_id).await?;
    Ok(Json(MatchResponse::from_record(&record, None)))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<MatchResponse>, AppError> {
    let view = state.engine.match_snapshot(match_id).await?;
    Ok(Json(view.into()))
}
