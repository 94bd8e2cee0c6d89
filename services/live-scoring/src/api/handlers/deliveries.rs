use axum::{
    extract::{Path, State},
    Json,
};
use cricket_types::ids::{DeliveryId, TeamId};

use crate::api::error::AppError;
use crate::api::models::{CorrectionRequest, CorrectionResponse, MetricsResponse, SquadRequest};
use crate::api::state::AppState;
use crate::metrics::AlertThresholds;

pub async fn correct_delivery(
    State(state): State<AppState>,
    Path(delivery_id): Path<DeliveryId>,
    Json(payload): Json<CorrectionRequest>,
) -> Result<Json<CorrectionResponse>, AppError> {
    let receipt = state
        .engine
        .correct(delivery_id, payload.patch, payload.actor)
        .await?;
    Ok(Json(CorrectionResponse::new(receipt.report, receipt.snapshot)))
}

/// Replace a team's playing XI. Applies to innings opened afterwards.
pub async fn put_squad(
    State(state): State<AppState>,
    Path(team): Path<String>,
    Json(payload): Json<SquadRequest>,
) -> Result<Json<SquadRequest>, AppError> {
    let team = TeamId::try_new(team).ok_or_else(|| AppError::BadRequest("team id must not be blank".into()))?;
    let limit = state.engine.config().max_team_size;
    if payload.players.len() < 2 || payload.players.len() > limit {
        return Err(AppError::BadRequest(format!(
            "a playing side needs between 2 and {} players",
            limit
        )));
    }
    state.roster.register(team, payload.players.clone());
    Ok(Json(payload))
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let metrics = state.engine.metrics();
    Json(MetricsResponse {
        counters: metrics.export(),
        alerts: metrics.check_thresholds(&AlertThresholds::default()),
    })
}
