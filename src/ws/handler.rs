//! WebSocket upgrade handler and per-connection session loop

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::Command;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Keep-alive ping period; idle clients keep proxies from closing the socket
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = state.game.allocate_client_id();
    info!(client_id, "New WebSocket connection");

    // Outbound path: game task -> this channel -> socket. The game task
    // closes the sender to kick the client.
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerMsg>();

    if !state
        .game
        .send(Command::Connect {
            id: client_id,
            tx: out_tx,
        })
        .await
    {
        return;
    }

    run_session(client_id, socket, &state, out_rx).await;

    // Idempotent with a kick-initiated removal
    state.game.send(Command::Disconnect { id: client_id }).await;
    info!(client_id, "WebSocket connection closed");
}

/// Session loop with read/write multiplexed over one task
async fn run_session(
    client_id: u32,
    socket: WebSocket,
    state: &AppState,
    mut out_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let rate_limiter = PlayerRateLimiter::new();
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            outbound = out_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                            debug!(client_id, error = %e, "WebSocket send failed");
                            break;
                        }
                    }
                    // Game task dropped our sender: the client was kicked
                    None => {
                        debug!(client_id, "Outbound channel closed");
                        break;
                    }
                }
            }
            inbound = ws_stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !rate_limiter.check_input() {
                            warn!(client_id, "Rate limited input message");
                            continue;
                        }
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(msg) => {
                                if !state.game.send(Command::Message { id: client_id, msg }).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(client_id, error = %e, "Failed to parse client message");
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!(client_id, "Received binary message, ignoring");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!(client_id, "Client initiated close");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(client_id, error = %e, "WebSocket error");
                        break;
                    }
                    None => break,
                }
            }
            _ = ping.tick() => {
                if ws_sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws_sink.send(Message::Close(None)).await;
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
