use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cricket_types::ids::{InningsId, PlayerId};

use crate::api::error::AppError;
use crate::api::models::{
    AnalyticsQuery, AnalyticsResponse, BattingRow, BowlingRow, DeliveryResponse, DeliveryRow, FallOfWicketRow,
    InningsResponse, OversResponse, PartnershipRow, SubmitDeliveryRequest,
};
use crate::api::state::AppState;

pub async fn submit_delivery(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
    Json(payload): Json<SubmitDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), AppError> {
    let receipt = state
        .engine
        .submit(innings_id, payload.draft, payload.actor)
        .await?;
    // A replayed client reference answers with the committed ball
    let status = if receipt.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt.into())))
}

pub async fn declare(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<InningsResponse>, AppError> {
    Ok(Json(state.engine.declare(innings_id).await?.into()))
}

pub async fn forfeit(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<InningsResponse>, AppError> {
    Ok(Json(state.engine.forfeit(innings_id).await?.into()))
}

pub async fn get_innings(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<InningsResponse>, AppError> {
    Ok(Json(state.engine.innings_snapshot(innings_id).await?.into()))
}

pub async fn batting(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<Vec<BattingRow>>, AppError> {
    let name = |p: &PlayerId| state.engine.display_name(p);
    let rows = state
        .engine
        .batting(innings_id)
        .await?
        .iter()
        .map(|f| BattingRow::new(f, &name))
        .collect();
    Ok(Json(rows))
}

pub async fn bowling(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<Vec<BowlingRow>>, AppError> {
    let name = |p: &PlayerId| state.engine.display_name(p);
    let rows = state
        .engine
        .bowling(innings_id)
        .await?
        .iter()
        .map(|f| BowlingRow::new(f, &name))
        .collect();
    Ok(Json(rows))
}

pub async fn partnerships(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<Vec<PartnershipRow>>, AppError> {
    let name = |p: &PlayerId| state.engine.display_name(p);
    let rows = state
        .engine
        .partnerships(innings_id)
        .await?
        .iter()
        .map(|p| PartnershipRow::new(p, &name))
        .collect();
    Ok(Json(rows))
}

pub async fn fall_of_wickets(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<Vec<FallOfWicketRow>>, AppError> {
    let name = |p: &PlayerId| state.engine.display_name(p);
    let rows = state
        .engine
        .fall_of_wickets(innings_id)
        .await?
        .iter()
        .map(|f| FallOfWicketRow::new(f, &name))
        .collect();
    Ok(Json(rows))
}

pub async fn overs(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<OversResponse>, AppError> {
    let overs = state.engine.over_summaries(innings_id).await?;
    Ok(Json(OversResponse { overs }))
}

pub async fn analytics(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let view = state.engine.analytics(innings_id).await?;
    let batter_wagon_wheel = match &query.batter {
        Some(batter) => Some(state.engine.wagon_wheel(innings_id, Some(batter)).await?),
        None => None,
    };
    let bowler_pitch_map = match &query.bowler {
        Some(bowler) => Some(state.engine.pitch_map(innings_id, Some(bowler)).await?),
        None => None,
    };
    Ok(Json(AnalyticsResponse {
        view,
        batter_wagon_wheel,
        bowler_pitch_map,
    }))
}

pub async fn deliveries(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<Vec<DeliveryRow>>, AppError> {
    let rows = state
        .engine
        .deliveries(innings_id)
        .await?
        .into_iter()
        .map(DeliveryRow::from)
        .collect();
    Ok(Json(rows))
}

/// Refold the innings from its log and compare with the live state.
pub async fn verify(
    State(state): State<AppState>,
    Path(innings_id): Path<InningsId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let metrics = state.engine.verify_innings(innings_id).await?;
    Ok(Json(serde_json::json!({
        "deliveries_replayed": metrics.deliveries_replayed,
        "duration_ms": metrics.duration_ms as u64,
        "state_checksum": metrics.state_checksum,
    })))
}
