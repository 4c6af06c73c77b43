// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Chatline orchestrator.
//!
//! Two streaming transports share one contract: the orchestrator's
//! [`ResponseStream`](chatline_agent::ResponseStream) ends with exactly one
//! final chunk, which becomes the SSE `message_stop`/`error` event or the
//! WebSocket `final`/`stopped`/`error` frame.

pub mod handlers;
pub mod server;
pub mod sse;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use chatline_agent::Orchestrator;
use chatline_core::ChatlineError;
use tokio_util::sync::CancellationToken;

pub use server::{GatewayState, MetricsRender, ServerConfig, router};

/// Gateway configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Optional Prometheus metrics render function for /metrics endpoint.
    pub prometheus_render: Option<MetricsRender>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "prometheus_render",
                &self.prometheus_render.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

/// The HTTP front end over one orchestrator.
pub struct Gateway {
    server: ServerConfig,
    state: GatewayState,
}

impl Gateway {
    pub fn new(config: GatewayConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            server: ServerConfig {
                host: config.host,
                port: config.port,
            },
            state: GatewayState::new(orchestrator, config.prometheus_render),
        }
    }

    /// The routes, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ChatlineError> {
        server::start_server(&self.server, self.state, shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_config_debug_hides_render_fn() {
        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            prometheus_render: Some(Arc::new(String::new)),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("<fn>"));
        assert!(debug.contains("127.0.0.1"));
    }
}
