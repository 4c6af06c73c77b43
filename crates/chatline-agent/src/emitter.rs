// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming emitter: the producer and consumer halves of a response.
//!
//! The [`Emitter`] is owned by the request task and turns backend deltas into
//! [`StreamChunk`]s. The [`ResponseStream`] is handed to the transport. Both
//! halves share a stop token, so a transport can cancel its own request and
//! nothing else.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use chatline_config::model::StreamingConfig;
use chatline_core::{ErrorKind, RequestId, StreamChunk, Termination};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a delta could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The request was stopped; the delta was suppressed.
    Stopped,
    /// The consumer went away.
    Closed,
}

/// Create a connected emitter and response stream.
pub fn channel(
    request_id: RequestId,
    stop: CancellationToken,
    config: &StreamingConfig,
) -> (Emitter, ResponseStream) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let emitter = Emitter {
        tx,
        stop: stop.clone(),
        pending: String::new(),
        coalesce_chars: config.coalesce_chars,
        flush_interval: config.flush_interval(),
        pending_since: None,
    };
    let stream = ResponseStream {
        request_id,
        rx,
        stop: StopHandle(stop),
        suppressed: false,
        done: false,
    };
    (emitter, stream)
}

/// Producer half. Finishing consumes it, so a request can send at most one
/// final chunk.
pub struct Emitter {
    tx: mpsc::Sender<StreamChunk>,
    stop: CancellationToken,
    pending: String,
    coalesce_chars: usize,
    flush_interval: Duration,
    /// When the oldest buffered text arrived.
    pending_since: Option<Instant>,
}

impl Emitter {
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Queue a delta, flushing when enough text has accumulated or the oldest
    /// buffered text has waited a flush interval. Deltas are never reordered.
    pub async fn send(&mut self, delta: &str) -> Result<(), EmitError> {
        if self.stop.is_cancelled() {
            self.pending.clear();
            self.pending_since = None;
            return Err(EmitError::Stopped);
        }
        if self.pending.is_empty() {
            self.pending_since = Some(Instant::now());
        }
        self.pending.push_str(delta);
        let due = self
            .flush_deadline()
            .is_some_and(|deadline| Instant::now() >= deadline);
        if self.pending.chars().count() >= self.coalesce_chars || due {
            self.flush().await?;
        }
        Ok(())
    }

    /// When buffered text must go out even if no further delta arrives.
    /// `None` while nothing is buffered.
    pub fn flush_deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.pending_since.map(|since| since + self.flush_interval)
    }

    /// Send buffered text now.
    pub async fn flush(&mut self) -> Result<(), EmitError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = StreamChunk::delta(std::mem::take(&mut self.pending));
        self.pending_since = None;
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => return Err(EmitError::Stopped),
            sent = self.tx.send(chunk) => sent.map_err(|_| EmitError::Closed)?,
        }
        Ok(())
    }

    /// Send `text` as the payload of the final chunk.
    pub async fn complete_with(mut self, text: String) {
        self.pending.push_str(&text);
        self.finish(Termination::Completed).await;
    }

    /// Send the single final chunk.
    ///
    /// A completed stream carries any coalesced remainder in the final
    /// payload. A cancelled stream discards it, since nothing may follow a
    /// stop except the final chunk.
    pub async fn finish(mut self, termination: Termination) {
        let chunk = match termination {
            Termination::Completed => StreamChunk::final_text(std::mem::take(&mut self.pending)),
            Termination::Cancelled => StreamChunk::cancelled(),
            Termination::Failed { kind, message } => {
                if !self.stop.is_cancelled() {
                    let _ = self.flush().await;
                }
                StreamChunk::failed(kind, message)
            }
        };
        if self.tx.send(chunk).await.is_err() {
            debug!("response stream dropped before the final chunk");
        }
    }
}

/// Cancels one request.
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn stop(&self) {
        self.0.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Consumer half: a finite, ordered stream of chunks ending in exactly one
/// final chunk.
///
/// Once the request is stopped, deltas still queued in the channel are
/// discarded and only the final chunk is delivered. If that discards any
/// text, a completed final chunk is reported as cancelled. If the producer
/// disappears without finishing, the stream ends with a synthesized
/// internal-error final chunk. Dropping the stream stops the request.
pub struct ResponseStream {
    request_id: RequestId,
    rx: mpsc::Receiver<StreamChunk>,
    stop: StopHandle,
    suppressed: bool,
    done: bool,
}

impl ResponseStream {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }
}

impl Stream for ResponseStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamChunk>> {
        if self.done {
            return Poll::Ready(None);
        }
        loop {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) if chunk.is_final => {
                    self.done = true;
                    let chunk = match chunk.termination {
                        Some(Termination::Completed) if self.suppressed => {
                            StreamChunk::cancelled()
                        }
                        _ => chunk,
                    };
                    return Poll::Ready(Some(chunk));
                }
                Poll::Ready(Some(chunk)) => {
                    if self.stop.is_stopped() {
                        self.suppressed = true;
                        continue;
                    }
                    return Poll::Ready(Some(chunk));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(Some(StreamChunk::failed(
                        ErrorKind::Internal,
                        "response ended without a final chunk",
                    )));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn config(coalesce_chars: usize) -> StreamingConfig {
        StreamingConfig {
            channel_capacity: 16,
            coalesce_chars,
            flush_interval_ms: 60_000,
        }
    }

    fn pair(coalesce_chars: usize) -> (Emitter, ResponseStream) {
        channel(
            RequestId("req".into()),
            CancellationToken::new(),
            &config(coalesce_chars),
        )
    }

    #[tokio::test]
    async fn deltas_then_one_final() {
        let (mut emitter, stream) = pair(0);
        emitter.send("Hel").await.unwrap();
        emitter.send("lo").await.unwrap();
        emitter.finish(Termination::Completed).await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], StreamChunk::delta("Hel"));
        assert_eq!(chunks[1], StreamChunk::delta("lo"));
        assert_eq!(chunks[2], StreamChunk::completed());
    }

    #[tokio::test]
    async fn coalescing_preserves_content_and_order() {
        let (mut emitter, stream) = pair(5);
        for piece in ["a", "b", "c", "d", "e", "f", "g"] {
            emitter.send(piece).await.unwrap();
        }
        emitter.finish(Termination::Completed).await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks[0], StreamChunk::delta("abcde"));
        assert_eq!(chunks[1], StreamChunk::final_text("fg"));
        assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
    }

    #[tokio::test]
    async fn stop_suppresses_later_deltas() {
        let (mut emitter, mut stream) = pair(0);
        emitter.send("before").await.unwrap();
        assert_eq!(stream.next().await, Some(StreamChunk::delta("before")));
        stream.stop();
        assert_eq!(emitter.send("after").await, Err(EmitError::Stopped));
        emitter.finish(Termination::Cancelled).await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![StreamChunk::cancelled()]);
    }

    #[tokio::test]
    async fn queued_deltas_are_dropped_after_stop() {
        let (mut emitter, stream) = pair(0);
        for piece in ["one ", "two ", "three "] {
            emitter.send(piece).await.unwrap();
        }
        stream.stop();
        emitter.finish(Termination::Cancelled).await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![StreamChunk::cancelled()]);
    }

    #[tokio::test]
    async fn completed_final_after_dropped_deltas_reads_as_cancelled() {
        let (mut emitter, stream) = pair(0);
        emitter.send("lost").await.unwrap();
        emitter.finish(Termination::Completed).await;
        stream.stop();

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![StreamChunk::cancelled()]);
    }

    #[tokio::test]
    async fn stopped_quick_reply_keeps_its_text() {
        let (emitter, stream) = pair(0);
        stream.stop();
        emitter.complete_with("Hi there!".into()).await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![StreamChunk::final_text("Hi there!")]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_deadline_tracks_the_oldest_buffered_text() {
        let (mut emitter, mut stream) = channel(
            RequestId("req".into()),
            CancellationToken::new(),
            &StreamingConfig {
                channel_capacity: 16,
                coalesce_chars: 100,
                flush_interval_ms: 50,
            },
        );
        assert_eq!(emitter.flush_deadline(), None);

        let start = Instant::now();
        emitter.send("par").await.unwrap();
        tokio::time::advance(Duration::from_millis(20)).await;
        emitter.send("tial").await.unwrap();
        assert_eq!(
            emitter.flush_deadline(),
            Some(start + Duration::from_millis(50))
        );

        tokio::time::sleep_until(start + Duration::from_millis(50)).await;
        emitter.flush().await.unwrap();
        assert_eq!(emitter.flush_deadline(), None);
        assert_eq!(stream.next().await, Some(StreamChunk::delta("partial")));
    }

    #[tokio::test]
    async fn failure_flushes_buffer_before_error() {
        let (mut emitter, stream) = pair(100);
        emitter.send("partial").await.unwrap();
        emitter
            .finish(Termination::Failed {
                kind: ErrorKind::Generation,
                message: "backend went away".into(),
            })
            .await;

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks[0], StreamChunk::delta("partial"));
        assert_eq!(
            chunks[1],
            StreamChunk::failed(ErrorKind::Generation, "backend went away")
        );
    }

    #[tokio::test]
    async fn complete_with_sends_a_single_final_chunk() {
        let (emitter, stream) = pair(0);
        emitter.complete_with("Hi there!".into()).await;
        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![StreamChunk::final_text("Hi there!")]);
    }

    #[tokio::test]
    async fn vanished_producer_still_yields_a_final_chunk() {
        let (mut emitter, stream) = pair(0);
        emitter.send("half").await.unwrap();
        drop(emitter);

        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_final);
        assert!(matches!(
            chunks[1].termination,
            Some(Termination::Failed {
                kind: ErrorKind::Internal,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_the_request() {
        let (mut emitter, stream) = pair(0);
        drop(stream);
        assert!(emitter.is_stopped());
        assert_eq!(emitter.send("x").await, Err(EmitError::Stopped));
    }

    #[tokio::test]
    async fn closed_receiver_reports_closed() {
        let (mut emitter, mut stream) = pair(0);
        stream.rx.close();
        assert_eq!(emitter.send("x").await, Err(EmitError::Closed));
    }
}
