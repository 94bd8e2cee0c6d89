use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{deliveries, innings, matches, ws};
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let match_routes = Router::new()
        .route("/matches", post(matches::create_match))
        .route("/matches/{id}", get(matches::get_match).delete(matches::release_match))
        .route("/matches/{id}/toss", put(matches::record_toss))
        .route("/matches/{id}/innings", post(matches::open_innings))
        .route("/matches/{id}/draw", post(matches::conclude_draw))
        .route("/matches/{id}/live", get(ws::live_feed));

    let innings_routes = Router::new()
        .route("/innings/{id}", get(innings::get_innings))
        .route(
            "/innings/{id}/deliveries",
            post(innings::submit_delivery).get(innings::deliveries),
        )
        .route("/innings/{id}/declare", post(innings::declare))
        .route("/innings/{id}/forfeit", post(innings::forfeit))
        .route("/innings/{id}/batting", get(innings::batting))
        .route("/innings/{id}/bowling", get(innings::bowling))
        .route("/innings/{id}/partnerships", get(innings::partnerships))
        .route("/innings/{id}/fall-of-wickets", get(innings::fall_of_wickets))
        .route("/innings/{id}/overs", get(innings::overs))
        .route("/innings/{id}/analytics", get(innings::analytics))
        .route("/innings/{id}/verify", get(innings::verify));

    Router::new()
        .merge(match_routes)
        .merge(innings_routes)
        .route("/deliveries/{id}/correct", post(deliveries::correct_delivery))
        .route("/teams/{id}/squad", put(deliveries::put_squad))
        .route("/metrics", get(deliveries::get_metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
