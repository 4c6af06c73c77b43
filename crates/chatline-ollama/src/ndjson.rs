// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NDJSON stream decoder for streaming `/api/chat` responses.
//!
//! Ollama streams one JSON object per line. Each line carries a message
//! delta and the last one sets `done`. Lines may be split across body chunks,
//! so bytes are buffered until a newline arrives.

use std::pin::Pin;

use bytes::Bytes;
use chatline_core::{ChatlineError, DeltaStream};
use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::types::ChatChunk;

type ByteStream<E> = Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>;

struct DecodeState<E> {
    bytes: ByteStream<E>,
    buffer: Vec<u8>,
    stop: CancellationToken,
    eof: bool,
    finished: bool,
}

/// Decode one line. Returns the delta text (if any) and whether the stream
/// is done.
fn decode_line(line: &[u8]) -> Result<(Option<String>, bool), ChatlineError> {
    let chunk: ChatChunk = serde_json::from_slice(line).map_err(|e| ChatlineError::Backend {
        message: format!("failed to parse stream line: {e}"),
        source: Some(Box::new(e)),
    })?;
    if let Some(error) = chunk.error {
        return Err(ChatlineError::backend(format!("ollama stream error: {error}")));
    }
    let delta = chunk
        .message
        .map(|message| message.content)
        .filter(|content| !content.is_empty());
    Ok((delta, chunk.done))
}

/// Turn a raw body stream into ordered text deltas.
///
/// The stream ends when a line sets `done`, when `stop` is cancelled, or
/// with an error if the body ends first.
pub fn decode_deltas<S, E>(bytes: S, stop: CancellationToken) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        stop,
        eof: false,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match decode_line(&line) {
                    Ok((delta, done)) => {
                        state.finished = done;
                        if let Some(text) = delta {
                            return Some((Ok(text), state));
                        }
                        continue;
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.eof {
                state.finished = true;
                return Some((
                    Err(ChatlineError::backend(
                        "ollama stream ended before completion",
                    )),
                    state,
                ));
            }

            let next = tokio::select! {
                biased;
                _ = state.stop.cancelled() => return None,
                next = state.bytes.next() => next,
            };
            match next {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(ChatlineError::Backend {
                            message: format!("stream read failed: {e}"),
                            source: Some(Box::new(e)),
                        }),
                        state,
                    ));
                }
                None => {
                    state.eof = true;
                    // A final line may arrive without a trailing newline.
                    if !state.buffer.iter().all(u8::is_ascii_whitespace) {
                        state.buffer.push(b'\n');
                    }
                }
            }
        }
    }))
}
