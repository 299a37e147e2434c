//! `GET /realtime?token=...`: the bidirectional trip channel.
//!
//! The token is checked before any frame is read. Refused sockets are closed
//! with 4001 (no token) or 4002 (bad token). Accepted sockets are registered
//! under the caller's identity; a writer task drains the registry channel onto
//! the socket while this task reads client frames.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use ride_core::model::Identity;
use ride_core::protocol::{ServerEvent, CLOSE_INVALID_TOKEN, CLOSE_MISSING_TOKEN};
use ride_core::registry::Outbound;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::AuthError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RealtimeParams {
    pub token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<RealtimeParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let verdict = state.auth.identify(params.token.as_deref());
    ws.on_upgrade(move |socket| async move {
        match verdict {
            Ok(identity) => run_channel(state, identity, socket).await,
            Err(err) => reject(socket, err).await,
        }
    })
}

async fn reject(mut socket: WebSocket, err: AuthError) {
    let (code, reason) = match err {
        AuthError::MissingToken => (CLOSE_MISSING_TOKEN, "No token"),
        _ => (CLOSE_INVALID_TOKEN, "Invalid token"),
    };
    debug!(code, error = %err, "realtime connection refused");
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

async fn run_channel(state: AppState, identity: Identity, socket: WebSocket) {
    let connection = state.service.connect(identity.clone());
    let connection_id = connection.id;
    let replies = connection.channel;
    let mut outbound = connection.outbound;
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                Outbound::Event(event) => {
                    if sink.send(Message::Text(event.to_json().into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                for reply in state.service.handle_frame(&identity, text.as_str()).await {
                    replies.send(reply);
                }
            }
            Ok(Message::Binary(_)) => {
                replies.send(ServerEvent::error("binary frames are not supported"));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%identity, error = %err, "socket read failed");
                break;
            }
        }
    }

    writer.abort();
    if let Err(err) = state.service.disconnect(&identity, connection_id).await {
        warn!(%identity, error = %err, "disconnect cleanup failed");
    }
    info!(%identity, %connection_id, "realtime channel closed");
}
