// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemetry sinks for finished request reports.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chatline_core::{RequestReport, TelemetrySink, Termination};
use tracing::{info, warn};

/// Requests slower than this are logged at `warn`.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(10);

/// Logs every report as one structured event.
#[derive(Debug, Clone)]
pub struct TracingTelemetry {
    slow_threshold: Duration,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    pub fn with_slow_threshold(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render checkpoints as `name=1.23s` pairs in recording order.
pub fn format_checkpoints(report: &RequestReport) -> String {
    let mut out = String::new();
    for checkpoint in &report.checkpoints {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{}={:.2}s", checkpoint.name, checkpoint.elapsed.as_secs_f64());
    }
    if report.dropped_checkpoints > 0 {
        let _ = write!(out, " (+{} dropped)", report.dropped_checkpoints);
    }
    out
}

fn outcome(termination: &Termination) -> &'static str {
    match termination {
        Termination::Completed => "completed",
        Termination::Cancelled => "cancelled",
        Termination::Failed { .. } => "failed",
    }
}

impl TelemetrySink for TracingTelemetry {
    fn record(&self, report: &RequestReport) {
        let checkpoints = format_checkpoints(report);
        let path = report.path.map(|p| p.to_string()).unwrap_or_default();
        let tier = report.tier.map(|t| t.to_string()).unwrap_or_default();
        if report.total >= self.slow_threshold {
            warn!(
                request_id = %report.request_id,
                path = path.as_str(),
                tier = tier.as_str(),
                outcome = outcome(&report.termination),
                total_secs = report.total.as_secs_f64(),
                checkpoints = checkpoints.as_str(),
                "slow request"
            );
        } else {
            info!(
                request_id = %report.request_id,
                path = path.as_str(),
                tier = tier.as_str(),
                outcome = outcome(&report.termination),
                total_secs = report.total.as_secs_f64(),
                checkpoints = checkpoints.as_str(),
                "request performance"
            );
        }
    }
}

/// Forwards every report to several sinks in order.
#[derive(Default, Clone)]
pub struct TelemetryFanout {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl TelemetryFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for TelemetryFanout {
    fn record(&self, report: &RequestReport) {
        for sink in &self.sinks {
            sink.record(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chatline_core::{Checkpoint, RequestId, ResponsePath};

    use super::*;

    fn report() -> RequestReport {
        RequestReport {
            request_id: RequestId("r1".into()),
            path: Some(ResponsePath::CacheHit),
            tier: None,
            termination: Termination::Completed,
            checkpoints: vec![
                Checkpoint {
                    name: "request_received",
                    elapsed: Duration::ZERO,
                },
                Checkpoint {
                    name: "cache_outcome",
                    elapsed: Duration::from_millis(1250),
                },
            ],
            dropped_checkpoints: 0,
            total: Duration::from_millis(1300),
        }
    }

    #[test]
    fn checkpoints_render_in_order() {
        assert_eq!(
            format_checkpoints(&report()),
            "request_received=0.00s cache_outcome=1.25s"
        );
    }

    #[test]
    fn dropped_checkpoints_are_noted() {
        let mut report = report();
        report.dropped_checkpoints = 3;
        assert!(format_checkpoints(&report).ends_with("(+3 dropped)"));
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl TelemetrySink for Counting {
        fn record(&self, _report: &RequestReport) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let fanout = TelemetryFanout::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingTelemetry::new()));
        fanout.record(&report());
        assert_eq!(fanout.len(), 3);
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(b.0.load(Ordering::SeqCst), 1);
    }
}
