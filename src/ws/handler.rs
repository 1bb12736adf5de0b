//! WebSocket upgrade handlers for rooms and matchmaking

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::auth::verify_jwt;
use crate::matchmaking::PlayerConn;
use crate::rooms::HubHandle;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{AuthMessage, BroadcastFrame, SpawnCommand};

/// WebSocket upgrade for a battle room
///
/// Unknown room ids are rejected before the upgrade.
pub async fn room_ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Response {
    match state.rooms.get_room(&room_id) {
        Some(handle) => ws.on_upgrade(move |socket| run_room_session(socket, handle)),
        None => {
            warn!(room_id = %room_id, "WebSocket upgrade for unknown room");
            Response::builder()
                .status(404)
                .body("Room not found".into())
                .unwrap()
        }
    }
}

/// Handle one client's connection to a room
///
/// Frames flow out through a writer task; spawn requests flow in
/// through the reader loop. The writer closes the socket when the
/// room goes away, which in turn ends the reader.
async fn run_room_session(socket: WebSocket, handle: HubHandle) {
    let room_id = handle.room_id;
    info!(room_id = %room_id, "New room connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut frames = handle.subscribe();
    let spawn_tx = handle.spawn_tx.clone();
    drop(handle);

    // Writer task: room frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match frames.recv().await {
                Ok(frame) => {
                    if let Err(e) = send_frame(&mut ws_sink, &frame).await {
                        debug!(room_id = %room_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        room_id = %room_id,
                        lagged_count = n,
                        "Client lagged, skipping {} frames", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(room_id = %room_id, "Room gone, ending frame writer");
                    break;
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> room hub
    let rate_limiter = PlayerRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_spawn() {
                    warn!(room_id = %room_id, "Rate limited spawn message");
                    continue;
                }

                match serde_json::from_str::<SpawnCommand>(&text) {
                    Ok(cmd) => {
                        if spawn_tx.send(cmd).await.is_err() {
                            debug!(room_id = %room_id, "Spawn channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(room_id = %room_id, error = %e, "Failed to parse spawn command");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(room_id = %room_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(room_id = %room_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(room_id = %room_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(room_id = %room_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(room_id = %room_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();

    info!(room_id = %room_id, "Room connection closed");
}

/// WebSocket upgrade for matchmaking
///
/// Authentication happens in-band: the first frame must carry the
/// JWT, so the upgrade itself is unconditional.
pub async fn matchmaking_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_matchmaking_handshake(socket, state))
}

/// Read the auth message, verify it and queue the socket for pairing
///
/// Any failure closes the socket; the queue only ever holds
/// authenticated connections.
async fn run_matchmaking_handshake(mut socket: WebSocket, state: AppState) {
    let auth = match socket.recv().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<AuthMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "Malformed matchmaking handshake");
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        },
        _ => {
            debug!("Matchmaking socket closed before handshake");
            return;
        }
    };

    if auth.kind != "auth" || auth.token.is_empty() {
        warn!("Matchmaking handshake missing auth token");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let claims = match verify_jwt(&auth.token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            error!(error = %e, "WebSocket auth failed");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let display_name = claims
        .username
        .unwrap_or_else(|| format!("Player_{}", &claims.sub.to_string()[..8]));

    info!(user_id = %claims.sub, "Player authenticated for matchmaking");

    let player = PlayerConn::new(claims.sub, display_name, socket);
    if let Err(player) = state.matchmaking.submit(player).await {
        warn!(user_id = %player.user_id, "Matchmaking loop unavailable, closing socket");
        let mut conn = player.conn;
        let _ = conn.send(Message::Close(None)).await;
    }
}

/// Send one frame over the socket
async fn send_frame(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &BroadcastFrame,
) -> Result<(), String> {
    let json = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
