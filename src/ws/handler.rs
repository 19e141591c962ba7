//! WebSocket upgrade handler

use std::fmt::Display;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, SplitStream},
    Sink, SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SeededRng;
use crate::http::middleware::verify_token;
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};
use crate::ws::session::GameSession;
use crate::ws::sink::StoreScoreSink;

/// How long queued replies get to reach the client after the reader stops
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token from `/api/login`
    pub token: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Verify the token before upgrading
    match verify_token(&query.token, &state.config.session_secret) {
        Ok(claims) => {
            info!(user_id = %claims.sub, "WebSocket upgrade for authenticated user");
            ws.on_upgrade(move |socket| handle_socket(socket, claims.sub, state))
        }
        Err(e) => {
            warn!(error = %e, "WebSocket auth failed");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    let (mut ws_sink, ws_stream) = socket.split();

    let account = match state.account_store.find_by_id(user_id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            warn!(user_id = %user_id, "Token for unknown account");
            let _ = send_msg(&mut ws_sink, &ServerMsg::error("not_found", "User not found")).await;
            return;
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Failed to fetch account");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::error("internal", "Account lookup failed"),
            )
            .await;
            return;
        }
    };

    let welcome = ServerMsg::Welcome {
        user_id,
        username: account.username.clone(),
        high_score: account.highest_score,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(user_id = %user_id, error = %e, "Failed to send welcome");
        return;
    }

    let session_id = state.sessions.open(user_id);
    info!(
        user_id = %user_id,
        session_id = %session_id,
        username = %account.username,
        active = state.sessions.active_sessions(),
        "Game session opened"
    );

    run_session(user_id, &state, ws_sink, ws_stream).await;

    state.sessions.close(&session_id);
    info!(user_id = %user_id, session_id = %session_id, "WebSocket connection closed");
}

/// Run the game session with read/write split
async fn run_session(
    user_id: Uuid,
    state: &AppState,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) {
    let rate_limiter = SessionRateLimiter::new();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Writer task: replies and score reports -> WebSocket
    let writer_handle = tokio::spawn(write_outbound(user_id, outbound_rx, ws_sink));

    let rng = SeededRng::from_entropy();
    debug!(user_id = %user_id, seed = rng.seed(), "Session RNG seeded");
    let sink = StoreScoreSink::new(state.account_store.clone(), user_id, outbound_tx.clone());
    let mut session = GameSession::new(user_id, rng, sink);

    // Reader loop: WebSocket -> game session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let replies = if !rate_limiter.check_input() {
                    warn!(user_id = %user_id, "Rate limited input message");
                    vec![ServerMsg::error("rate_limited", "Too many messages")]
                } else {
                    match serde_json::from_str::<ClientMsg>(&text) {
                        Ok(client_msg) => session.handle(client_msg),
                        Err(e) => {
                            warn!(user_id = %user_id, error = %e, "Failed to parse client message");
                            vec![ServerMsg::error("bad_message", e.to_string())]
                        }
                    }
                };

                if replies.into_iter().any(|msg| outbound_tx.send(msg).is_err()) {
                    debug!(user_id = %user_id, "Outbound channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                debug!(user_id = %user_id, "Received ping/pong");
            }
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    if let Some(game) = session.current_match().filter(|game| game.is_playing()) {
        info!(user_id = %user_id, match_id = %game.id, "Match dropped on disconnect");
    }

    // The sink's sender goes with the session; queued replies still flush
    drop(session);
    drop(outbound_tx);
    finish_writer(user_id, writer_handle, WRITER_FLUSH_TIMEOUT).await;
}

/// Forward queued messages to the socket until every sender is gone
async fn write_outbound<W>(
    user_id: Uuid,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMsg>,
    mut sink: W,
) where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut sink, &msg).await {
            debug!(user_id = %user_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Wait for the writer to drain, aborting it after `grace`
async fn finish_writer(user_id: Uuid, mut writer_handle: JoinHandle<()>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, &mut writer_handle).await {
        Ok(_) => true,
        Err(_) => {
            warn!(user_id = %user_id, "Writer did not drain in time, aborting");
            writer_handle.abort();
            false
        }
    }
}

/// Send a message over WebSocket
async fn send_msg<W>(sink: &mut W, msg: &ServerMsg) -> Result<(), String>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc as frames;

    use super::*;

    fn text(frame: Message) -> serde_json::Value {
        match frame {
            Message::Text(json) => serde_json::from_str(&json).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn queued_replies_flush_after_the_reader_stops() {
        let user_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = frames::unbounded::<Message>();

        outbound_tx.send(ServerMsg::Pong { t: 1 }).unwrap();
        outbound_tx.send(ServerMsg::MatchAbandoned).unwrap();
        let writer = tokio::spawn(write_outbound(user_id, outbound_rx, socket_tx));
        drop(outbound_tx);

        assert!(finish_writer(user_id, writer, Duration::from_secs(1)).await);

        let sent: Vec<_> = socket_rx.map(text).collect().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["type"], "pong");
        assert_eq!(sent[1]["type"], "match_abandoned");
    }

    #[tokio::test]
    async fn writer_held_open_is_aborted_after_grace() {
        let user_id = Uuid::new_v4();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (socket_tx, _socket_rx) = frames::unbounded::<Message>();
        let writer = tokio::spawn(write_outbound(user_id, outbound_rx, socket_tx));

        assert!(!finish_writer(user_id, writer, Duration::from_millis(20)).await);
        drop(outbound_tx);
    }
}
