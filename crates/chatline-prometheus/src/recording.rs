// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_gauge, describe_histogram};

use chatline_core::{RequestReport, Termination};

/// Register all Chatline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("chatline_requests_total", "Finished requests by path and outcome");
    describe_counter!("chatline_request_errors_total", "Failed requests by error kind");
    describe_histogram!(
        "chatline_request_duration_seconds",
        "Time from receipt to the final chunk in seconds"
    );
    describe_histogram!(
        "chatline_checkpoint_seconds",
        "Elapsed time at each pipeline checkpoint in seconds"
    );
    describe_gauge!("chatline_requests_in_flight", "Requests currently being answered");
    describe_gauge!("chatline_pool_in_use", "Leased backend connections");
}

/// Record one finished request.
pub fn record_report(report: &RequestReport) {
    let path = report
        .path
        .map(|p| p.to_string())
        .unwrap_or_else(|| "rejected".to_string());
    let outcome = match &report.termination {
        Termination::Completed => "completed",
        Termination::Cancelled => "cancelled",
        Termination::Failed { kind, .. } => {
            metrics::counter!("chatline_request_errors_total", "kind" => kind.to_string())
                .increment(1);
            "failed"
        }
    };

    metrics::counter!(
        "chatline_requests_total",
        "path" => path.clone(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("chatline_request_duration_seconds", "path" => path)
        .record(report.total.as_secs_f64());

    for checkpoint in &report.checkpoints {
        metrics::histogram!("chatline_checkpoint_seconds", "checkpoint" => checkpoint.name)
            .record(checkpoint.elapsed.as_secs_f64());
    }
}

/// Set the number of in-flight requests.
pub fn set_in_flight(count: usize) {
    metrics::gauge!("chatline_requests_in_flight").set(count as f64);
}

/// Set the number of leased backend connections.
pub fn set_pool_in_use(count: usize) {
    metrics::gauge!("chatline_pool_in_use").set(count as f64);
}
