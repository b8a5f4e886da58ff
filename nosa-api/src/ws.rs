//! # Packet stream over WebSocket
//!
//! Each connection owns one hub subscription for its lifetime. The server
//! sends the capture status once, then one `packet` message per record.
//! Clients may send `{"type":"ping"}` at any time and get a `pong` back.
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{sink::Sink, SinkExt, StreamExt};
use nosa_core::engine::CaptureStatus;
use nosa_core::record::PacketRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::handlers::blocking;
use crate::AppState;

/// Server → client messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Status(CaptureStatus),
    Packet(Arc<PacketRecord>),
    Pong,
}

/// Client → server messages. Anything else is ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// GET /ws/packets
pub async fn packets_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_packets(socket, state))
}

async fn stream_packets(socket: WebSocket, state: AppState) {
    // Subscribe before sending the status so no record published in between
    // is missed.
    let mut subscription = state.engine.subscribe();
    let id = subscription.id();
    info!(subscriber = %id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    let status = match blocking(&state, |engine| Ok(engine.status())).await {
        Ok(status) => status,
        Err(e) => {
            debug!(subscriber = %id, error = e.detail(), "Failed to read capture status");
            return;
        }
    };
    if !send(&mut sink, &ServerMessage::Status(status)).await {
        return;
    }

    loop {
        tokio::select! {
            record = subscription.recv() => {
                let Some(record) = record else {
                    debug!(subscriber = %id, "Subscription evicted by hub");
                    break;
                };
                if !send(&mut sink, &ServerMessage::Packet(record)).await {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if ClientMessage::parse(&text) == Some(ClientMessage::Ping)
                        && !send(&mut sink, &ServerMessage::Pong).await
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = %id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    }

    drop(subscription);
    info!(subscriber = %id, "WebSocket client disconnected");
}

/// Returns `false` once the socket can no longer be written to.
async fn send<S>(sink: &mut S, message: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "Failed to encode WebSocket message");
            return true;
        }
    };
    sink.send(Message::Text(text)).await.is_ok()
}
