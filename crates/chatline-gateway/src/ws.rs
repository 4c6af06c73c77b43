// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for duplex chat with stop.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "user_message", "text": "Hello", "conversation": {"id": "c1", "messages": []}}
//! {"type": "stop"}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "chunk", "content": "partial...", "done": false}
//! {"type": "final", "content": "", "done": true}
//! {"type": "stopped", "done": true}
//! {"type": "error", "content": "...", "kind": "backend_busy", "done": true}
//! ```
//!
//! A socket runs one request at a time. Each request ends with exactly one of
//! `final`, `stopped` or `error`. The language and user come from the query
//! string (`/ws?lang=en&user_id=u1`).

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chatline_agent::{ResponseStream, StopHandle};
use chatline_core::{ErrorKind, Language, MemoryMode, StreamChunk, Termination};

use crate::handlers::{ConversationBody, incoming_message};
use crate::server::GatewayState;

/// Connection parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub lang: Language,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// WebSocket message from client.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsIncoming {
    UserMessage {
        text: String,
        #[serde(default)]
        conversation: Option<ConversationBody>,
        #[serde(default)]
        memory_type: MemoryMode,
        /// Overrides the connection language for this message.
        #[serde(default)]
        lang: Option<Language>,
    },
    Stop,
}

/// WebSocket message to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    Chunk { content: String, done: bool },
    Final { content: String, done: bool },
    Stopped { done: bool },
    Error {
        content: String,
        kind: ErrorKind,
        done: bool,
    },
}

impl WsOutgoing {
    fn error(kind: ErrorKind, content: impl Into<String>) -> Self {
        WsOutgoing::Error {
            content: content.into(),
            kind,
            done: true,
        }
    }

    fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The frame a response chunk maps to.
pub(crate) fn chunk_frame(chunk: StreamChunk) -> WsOutgoing {
    if !chunk.is_final {
        return WsOutgoing::Chunk {
            content: chunk.payload,
            done: false,
        };
    }
    match chunk.termination {
        Some(Termination::Cancelled) => WsOutgoing::Stopped { done: true },
        Some(Termination::Failed { kind, message }) => WsOutgoing::error(kind, message),
        Some(Termination::Completed) | None => WsOutgoing::Final {
            content: chunk.payload,
            done: true,
        },
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// The request currently streaming on a socket.
struct Active {
    stop: StopHandle,
    forwarder: JoinHandle<()>,
}

impl Active {
    fn is_running(&self) -> bool {
        !self.forwarder.is_finished()
    }
}

fn forward(mut response: ResponseStream, out: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = response.next().await {
            if out.send(chunk_frame(chunk).to_text()).await.is_err() {
                break;
            }
        }
    })
}

/// Handle an individual WebSocket connection.
///
/// A writer task drains outgoing frames to the socket. The read loop accepts
/// user messages and stop commands; each accepted message gets a forwarder
/// task that turns response chunks into frames.
async fn handle_socket(socket: WebSocket, state: GatewayState, params: WsParams) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let mut active: Option<Active> = None;
    while let Some(Ok(msg)) = ws_receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let incoming: WsIncoming = match serde_json::from_str(text.as_str()) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("invalid WebSocket message: {e}");
                let frame = WsOutgoing::error(ErrorKind::Validation, format!("invalid message: {e}"));
                if tx.send(frame.to_text()).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let reply = match incoming {
            WsIncoming::Stop => match active.as_ref().filter(|a| a.is_running()) {
                Some(current) => {
                    current.stop.stop();
                    None
                }
                None => Some(WsOutgoing::Stopped { done: true }),
            },
            WsIncoming::UserMessage {
                text,
                conversation,
                memory_type,
                lang,
            } => {
                if active.as_ref().is_some_and(Active::is_running) {
                    Some(WsOutgoing::error(
                        ErrorKind::Validation,
                        "a request is already in progress on this connection",
                    ))
                } else {
                    let message = incoming_message(
                        text,
                        lang.unwrap_or(params.lang),
                        memory_type,
                        params.user_id.clone(),
                        conversation,
                    );
                    match state.orchestrator.submit(message) {
                        Ok(response) => {
                            active = Some(Active {
                                stop: response.stop_handle(),
                                forwarder: forward(response, tx.clone()),
                            });
                            None
                        }
                        Err(e) => Some(WsOutgoing::error(e.kind(), e.to_string())),
                    }
                }
            }
        };

        if let Some(frame) = reply {
            if tx.send(frame.to_text()).await.is_err() {
                break;
            }
        }
    }

    // Cleanup.
    if let Some(current) = active {
        current.stop.stop();
        current.forwarder.abort();
    }
    drop(tx);
    writer.abort();
}
