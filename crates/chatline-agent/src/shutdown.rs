// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the server monitors. In-flight requests are
//! drained before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::orchestrator::Orchestrator;

/// Interval between in-flight checks while draining.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for in-flight requests to finish, then stops the
/// rest. Returns the number of requests that had to be stopped.
pub async fn drain_requests(orchestrator: &Orchestrator, timeout: Duration) -> usize {
    if orchestrator.in_flight() == 0 {
        info!("no in-flight requests to drain");
        return 0;
    }

    info!(
        count = orchestrator.in_flight(),
        "waiting for in-flight requests to complete"
    );

    let drained = tokio::time::timeout(timeout, async {
        while orchestrator.in_flight() > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;

    if drained.is_ok() {
        info!("all requests drained successfully");
        0
    } else {
        let stopped = orchestrator.stop_all();
        warn!(remaining = stopped, "timeout reached, stopping remaining requests");
        stopped
    }
}
