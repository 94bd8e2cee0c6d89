use axum::{
    body::Bytes,
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use cricket_types::ids::MatchId;
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, info};

use crate::api::error::AppError;
use crate::api::state::AppState;
use crate::hub::Subscription;

/// Close code sent to a subscriber the hub dropped for lagging ("try again later").
const CLOSE_LAGGING: u16 = 1013;

pub async fn live_feed(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Response, AppError> {
    // Subscribe before upgrading so the catch-up snapshot is already queued
    let subscription = state.engine.subscribe(match_id)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, subscription)))
}

async fn handle_socket(socket: WebSocket, state: AppState, mut subscription: Subscription) {
    let match_id = subscription.match_id;
    let subscriber_id = subscription.id;
    info!(match_id = %match_id, subscriber_id, "Live feed connected");

    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = tokio::time::interval(state.heartbeat);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            update = subscription.recv() => {
                let Some(update) = update else {
                    let frame = CloseFrame {
                        code: CLOSE_LAGGING,
                        reason: Utf8Bytes::from("lagging subscriber, resubscribe for a fresh snapshot"),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                };
                let text = match serde_json::to_string(&update) {
                    Ok(text) => text,
                    Err(e) => {
                        debug!(match_id = %match_id, error = %e, "Update not serializable");
                        continue;
                    }
                };
                if sender.send(Message::Text(Utf8Bytes::from(text))).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.engine.hub().unsubscribe(match_id, subscriber_id);
    info!(match_id = %match_id, subscriber_id, "Live feed disconnected");
}
