// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events (SSE) streaming for POST /api/chat/stream.
//!
//! SSE event format:
//! ```text
//! event: message_start
//! data: {"request_id": "..."}
//!
//! event: text_delta
//! data: {"text": "partial content here"}
//!
//! event: message_stop
//! data: {"status": "completed"}
//! ```
//!
//! Every stream ends with exactly one `message_stop` or `error` event. A
//! message rejected by validation gets a plain 400 response instead of a
//! stream. Closing the connection stops the request.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, StreamExt};
use serde_json::{Value, json};

use chatline_core::{StreamChunk, Termination};

use crate::handlers::{ChatRequest, error_response};
use crate::server::GatewayState;

/// SSE event names.
pub mod event_types {
    pub const MESSAGE_START: &str = "message_start";
    pub const TEXT_DELTA: &str = "text_delta";
    pub const MESSAGE_STOP: &str = "message_stop";
    pub const ERROR: &str = "error";
}

/// The events one chunk maps to.
pub(crate) fn chunk_frames(chunk: &StreamChunk) -> Vec<(&'static str, Value)> {
    let mut frames = Vec::new();
    if !chunk.payload.is_empty() {
        frames.push((event_types::TEXT_DELTA, json!({ "text": chunk.payload })));
    }
    if chunk.is_final {
        let frame = match &chunk.termination {
            Some(Termination::Failed { kind, message }) => (
                event_types::ERROR,
                json!({
                    "error": message,
                    "kind": kind,
                    "retryable": kind.is_retryable(),
                }),
            ),
            Some(Termination::Cancelled) => {
                (event_types::MESSAGE_STOP, json!({ "status": "cancelled" }))
            }
            Some(Termination::Completed) | None => {
                (event_types::MESSAGE_STOP, json!({ "status": "completed" }))
            }
        };
        frames.push(frame);
    }
    frames
}

fn to_event((name, data): (&'static str, Value)) -> Result<Event, Infallible> {
    Ok(Event::default().event(name).data(data.to_string()))
}

/// POST /api/chat/stream
pub async fn chat_stream(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Response {
    let response = match state.orchestrator.submit(body.into_message()) {
        Ok(response) => response,
        Err(e) => return error_response(&e),
    };

    let request_id = response.request_id().to_string();
    tracing::debug!(request_id = request_id.as_str(), "sse stream opened");

    let start = stream::once(async move {
        (event_types::MESSAGE_START, json!({ "request_id": request_id }))
    });
    let body = response.flat_map(|chunk| stream::iter(chunk_frames(&chunk)));

    Sse::new(start.chain(body).map(to_event))
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use chatline_core::ErrorKind;

    use super::*;

    fn names(frames: &[(&'static str, Value)]) -> Vec<&'static str> {
        frames.iter().map(|(name, _)| *name).collect()
    }

    #[test]
    fn delta_maps_to_text_delta() {
        let frames = chunk_frames(&StreamChunk::delta("Bon"));
        assert_eq!(names(&frames), vec![event_types::TEXT_DELTA]);
        assert_eq!(frames[0].1["text"], "Bon");
    }

    #[test]
    fn quick_reply_final_carries_text_then_stop() {
        let frames = chunk_frames(&StreamChunk::final_text("Hello!"));
        assert_eq!(
            names(&frames),
            vec![event_types::TEXT_DELTA, event_types::MESSAGE_STOP]
        );
        assert_eq!(frames[1].1["status"], "completed");
    }

    #[test]
    fn cancelled_final_is_a_stop_event() {
        let frames = chunk_frames(&StreamChunk::cancelled());
        assert_eq!(names(&frames), vec![event_types::MESSAGE_STOP]);
        assert_eq!(frames[0].1["status"], "cancelled");
    }

    #[test]
    fn failed_final_is_an_error_event() {
        let frames = chunk_frames(&StreamChunk::failed(ErrorKind::BackendBusy, "busy"));
        assert_eq!(names(&frames), vec![event_types::ERROR]);
        assert_eq!(frames[0].1["kind"], "backend_busy");
        assert_eq!(frames[0].1["retryable"], true);
    }
}
