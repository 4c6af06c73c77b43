// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request performance trace.

use std::time::Duration;

use chatline_core::{Checkpoint, RequestId, RequestReport, ResponsePath, RouteTier, Termination};
use tokio::time::Instant;

/// Checkpoint names, in the order a request passes them.
pub mod checkpoints {
    pub const REQUEST_RECEIVED: &str = "request_received";
    pub const MESSAGE_PREPROCESSED: &str = "message_preprocessed";
    pub const LOOKUP_DISPATCHED: &str = "history_cache_dispatched";
    pub const CACHE_OUTCOME: &str = "cache_outcome_known";
    pub const PLAN_BUILT: &str = "generation_plan_built";
    pub const RESPONSE_OBTAINED: &str = "response_obtained";
    pub const CACHE_UPDATED: &str = "cache_updated";
    pub const STREAMING_COMPLETE: &str = "streaming_complete";
}

/// Upper bound on recorded checkpoints per request.
pub const MAX_CHECKPOINTS: usize = 32;

/// Append-only list of named checkpoints, relative to request start.
///
/// Recording never fails the request. Checkpoints that cannot be kept are
/// counted as dropped and show up in the report.
#[derive(Debug)]
pub struct PerformanceTrace {
    started: Instant,
    checkpoints: Vec<Checkpoint>,
    dropped: usize,
}

impl PerformanceTrace {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            checkpoints: Vec::with_capacity(8),
            dropped: 0,
        }
    }

    pub fn checkpoint(&mut self, name: &'static str) {
        if self.checkpoints.len() >= MAX_CHECKPOINTS {
            self.dropped += 1;
            return;
        }
        self.checkpoints.push(Checkpoint {
            name,
            elapsed: self.started.elapsed(),
        });
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Recorded checkpoints, oldest first.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Consume the trace into a report for telemetry sinks.
    pub fn report(
        self,
        request_id: RequestId,
        path: Option<ResponsePath>,
        tier: Option<RouteTier>,
        termination: Termination,
    ) -> RequestReport {
        let total = self.started.elapsed();
        RequestReport {
            request_id,
            path,
            tier,
            termination,
            checkpoints: self.checkpoints,
            dropped_checkpoints: self.dropped,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn checkpoints_keep_order_and_elapsed_time() {
        let mut trace = PerformanceTrace::start();
        trace.checkpoint(checkpoints::REQUEST_RECEIVED);
        tokio::time::sleep(Duration::from_millis(20)).await;
        trace.checkpoint(checkpoints::MESSAGE_PREPROCESSED);

        let names: Vec<_> = trace.checkpoints().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![checkpoints::REQUEST_RECEIVED, checkpoints::MESSAGE_PREPROCESSED]
        );
        assert_eq!(trace.checkpoints()[0].elapsed, Duration::ZERO);
        assert_eq!(trace.checkpoints()[1].elapsed, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn overflow_is_counted_not_fatal() {
        let mut trace = PerformanceTrace::start();
        for _ in 0..MAX_CHECKPOINTS + 5 {
            trace.checkpoint(checkpoints::RESPONSE_OBTAINED);
        }
        assert_eq!(trace.checkpoints().len(), MAX_CHECKPOINTS);
        assert_eq!(trace.dropped(), 5);

        let report = trace.report(
            RequestId("r".into()),
            Some(ResponsePath::Generated),
            Some(RouteTier::General),
            Termination::Completed,
        );
        assert_eq!(report.dropped_checkpoints, 5);
        assert_eq!(report.checkpoints.len(), MAX_CHECKPOINTS);
        assert_eq!(report.path, Some(ResponsePath::Generated));
    }
}
