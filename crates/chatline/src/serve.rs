// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatline serve` command implementation.
//!
//! Wires the Ollama backends, the connection pool, the response cache and the
//! in-memory history store into one orchestrator, puts the gateway in front
//! of it and runs until SIGINT/SIGTERM. On shutdown the gateway stops
//! accepting connections, in-flight requests get a grace period, and the
//! pool is closed.

use std::sync::Arc;
use std::time::Duration;

use chatline_agent::{
    BackendPool, Collaborators, Orchestrator, TelemetryFanout, TracingTelemetry, shutdown,
};
use chatline_cache::ResponseCache;
use chatline_config::model::ChatlineConfig;
use chatline_core::{ChatlineError, GenerationBackend, HealthStatus};
use chatline_gateway::{Gateway, GatewayConfig, MetricsRender};
use chatline_ollama::{OllamaClassifier, OllamaClient, OllamaConnector};
use chatline_pool::{ConnectionPool, Connector};
use chatline_storage::MemoryHistoryStore;
#[cfg(feature = "prometheus")]
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Grace period for in-flight requests after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How often pool and request gauges are sampled.
#[cfg(feature = "prometheus")]
const GAUGE_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the `chatline serve` command.
pub async fn run_serve(config: ChatlineConfig) -> Result<(), ChatlineError> {
    init_tracing(&config.log.level);

    info!("starting chatline serve");

    let (telemetry, metrics_render) = build_telemetry(&config);

    let classification = Arc::new(OllamaClassifier::new(OllamaClient::new(&config.ollama)?));
    let connector: Arc<dyn Connector<Handle = Arc<dyn GenerationBackend>>> =
        Arc::new(OllamaConnector::new(config.ollama.clone()));
    let pool: Arc<BackendPool> = Arc::new(ConnectionPool::new(connector, &config.pool).await?);
    let cache = Arc::new(ResponseCache::new(config.cache.capacity));
    let history = Arc::new(MemoryHistoryStore::new());

    let orchestrator = Arc::new(Orchestrator::new(
        &config,
        Collaborators {
            classification,
            pool: Arc::clone(&pool),
            cache,
            history,
            telemetry: Arc::new(telemetry),
        },
    ));

    report_component_health(&orchestrator).await;

    let cancel = shutdown::install_signal_handler();

    #[cfg(feature = "prometheus")]
    if metrics_render.is_some() {
        spawn_gauge_sampler(Arc::clone(&orchestrator), cancel.clone());
    }

    let gateway = Gateway::new(
        GatewayConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            prometheus_render: metrics_render,
        },
        Arc::clone(&orchestrator),
    );
    let mut server = tokio::spawn(gateway.serve(cancel.clone()));

    tokio::select! {
        finished = &mut server => {
            // The server only returns early when it failed to start.
            cancel.cancel();
            return flatten(finished);
        }
        _ = cancel.cancelled() => {}
    }

    info!("shutdown signal received, draining in-flight requests");
    let stopped = shutdown::drain_requests(&orchestrator, DRAIN_TIMEOUT).await;
    pool.close();
    let result = flatten(server.await);

    info!(stopped, "chatline serve shutdown complete");
    result
}

fn flatten(
    joined: Result<Result<(), ChatlineError>, tokio::task::JoinError>,
) -> Result<(), ChatlineError> {
    joined.map_err(|e| ChatlineError::Internal(format!("gateway task failed: {e}")))?
}

/// Tracing sink always; Prometheus sink and renderer when enabled.
fn build_telemetry(config: &ChatlineConfig) -> (TelemetryFanout, Option<MetricsRender>) {
    let fanout = TelemetryFanout::new().with(Arc::new(TracingTelemetry::new()));

    #[cfg(feature = "prometheus")]
    if config.prometheus.enabled {
        match chatline_prometheus::PrometheusExporter::install() {
            Ok(exporter) => {
                info!("prometheus metrics enabled");
                let exporter = Arc::new(exporter);
                let render: MetricsRender = Arc::new(move || exporter.render());
                return (
                    fanout.with(Arc::new(chatline_prometheus::PrometheusTelemetry)),
                    Some(render),
                );
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            }
        }
    }

    #[cfg(not(feature = "prometheus"))]
    if config.prometheus.enabled {
        warn!("prometheus enabled in config but the feature is not compiled in");
    }

    (fanout, None)
}

#[cfg(feature = "prometheus")]
fn spawn_gauge_sampler(orchestrator: Arc<Orchestrator>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(GAUGE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    chatline_prometheus::set_in_flight(orchestrator.in_flight());
                    chatline_prometheus::set_pool_in_use(orchestrator.pool_stats().in_use);
                }
                _ = cancel.cancelled() => break,
            }
        }
    });
}

/// Log backend reachability at startup. An unreachable backend is not fatal;
/// requests fail with a generation error until it comes up.
async fn report_component_health(orchestrator: &Orchestrator) {
    for component in orchestrator.component_health().await {
        match component.status {
            HealthStatus::Healthy => info!(
                component = component.name.as_str(),
                kind = %component.adapter_type,
                "component healthy"
            ),
            HealthStatus::Degraded(detail) | HealthStatus::Unhealthy(detail) => warn!(
                component = component.name.as_str(),
                kind = %component.adapter_type,
                detail = detail.as_str(),
                "component not ready"
            ),
        }
    }
}

/// Initialize the tracing subscriber with an `EnvFilter`.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
