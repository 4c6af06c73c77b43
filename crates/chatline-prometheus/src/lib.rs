// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for Chatline.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use chatline_core::{ChatlineError, RequestReport, TelemetrySink};

pub use recording::{record_report, register_metrics, set_in_flight, set_pool_in_use};

/// Installed Prometheus recorder.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process. Returns an error if a
    /// recorder is already installed.
    pub fn install() -> Result<Self, ChatlineError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ChatlineError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Telemetry sink that turns request reports into metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusTelemetry;

impl TelemetrySink for PrometheusTelemetry {
    fn record(&self, report: &RequestReport) {
        recording::record_report(report);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatline_core::{
        Checkpoint, ErrorKind, RequestId, ResponsePath, RouteTier, Termination,
    };

    use super::*;

    fn report(termination: Termination) -> RequestReport {
        RequestReport {
            request_id: RequestId("r1".into()),
            path: Some(ResponsePath::Generated),
            tier: Some(RouteTier::Code),
            termination,
            checkpoints: vec![Checkpoint {
                name: "plan_built",
                elapsed: Duration::from_millis(3),
            }],
            dropped_checkpoints: 0,
            total: Duration::from_millis(120),
        }
    }

    // A local recorder keeps tests independent of the global one.
    fn render_with(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    #[test]
    fn completed_report_counts_by_path_and_outcome() {
        let output = render_with(|| PrometheusTelemetry.record(&report(Termination::Completed)));
        assert!(output.contains("chatline_requests_total"));
        assert!(output.contains(r#"path="generated""#));
        assert!(output.contains(r#"outcome="completed""#));
        assert!(output.contains("chatline_checkpoint_seconds"));
        assert!(!output.contains("chatline_request_errors_total"));
    }

    #[test]
    fn failed_report_counts_error_kind() {
        let output = render_with(|| {
            PrometheusTelemetry.record(&report(Termination::Failed {
                kind: ErrorKind::BackendBusy,
                message: "busy".into(),
            }))
        });
        assert!(output.contains(r#"chatline_request_errors_total{kind="backend_busy"} 1"#));
        assert!(output.contains(r#"outcome="failed""#));
    }

    #[test]
    fn gauges_render() {
        let output = render_with(|| {
            set_in_flight(2);
            set_pool_in_use(1);
        });
        assert!(output.contains("chatline_requests_in_flight 2"));
        assert!(output.contains("chatline_pool_in_use 1"));
    }
}
