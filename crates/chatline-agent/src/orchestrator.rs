// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request orchestrator.
//!
//! [`Orchestrator::submit`] validates a message synchronously and hands back a
//! [`ResponseStream`]. Everything after validation runs on one spawned task per
//! request:
//! - **Quick reply**: canned text as the sole chunk, no backend involved
//! - **Routing**: cache lookup and history load run concurrently
//! - **Cache hit**: cached text replayed, history awaited only for bookkeeping
//! - **Generation**: classify, plan, lease a backend, stream deltas
//!
//! Every path ends with exactly one final chunk, a telemetry report and, for
//! completed conversations, a history append.

use std::sync::Arc;
use std::time::Duration;

use chatline_cache::{CacheKey, CacheStats, ResponseCache};
use chatline_config::model::{ChatlineConfig, StreamingConfig};
use chatline_core::{
    AdapterType, ChatlineError, ClassificationBackend, GenerationBackend, HealthStatus,
    HistoryStore, IncomingMessage, MessageDescriptor, PluginAdapter, RequestId, ResponsePath,
    RouteTier, TelemetrySink, Termination, Turn,
};
use chatline_pool::{ConnectionPool, PoolStats};
use chatline_router::{Classifier, ParameterOptimizer, Preprocessor};
use dashmap::DashMap;
use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::emitter::{self, EmitError, Emitter, ResponseStream};
use crate::monitor::{PerformanceTrace, checkpoints};
use crate::prompt::PromptBuilder;
use crate::state::{RequestFsm, RequestState};

/// Pool of generation backend handles.
pub type BackendPool = ConnectionPool<Arc<dyn GenerationBackend>>;

/// Process-wide collaborators injected into the orchestrator.
pub struct Collaborators {
    pub classification: Arc<dyn ClassificationBackend>,
    pub pool: Arc<BackendPool>,
    pub cache: Arc<ResponseCache>,
    pub history: Arc<dyn HistoryStore>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// Health of one injected adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentHealth {
    pub name: String,
    pub adapter_type: AdapterType,
    pub status: HealthStatus,
}

/// Drives requests through preprocessing, routing, generation and streaming.
pub struct Orchestrator {
    preprocessor: Preprocessor,
    classifier: Classifier,
    classification: Arc<dyn ClassificationBackend>,
    optimizer: ParameterOptimizer,
    prompts: PromptBuilder,
    cache: Arc<ResponseCache>,
    cache_context_turns: usize,
    pool: Arc<BackendPool>,
    history: Arc<dyn HistoryStore>,
    telemetry: Arc<dyn TelemetrySink>,
    streaming: StreamingConfig,
    first_token_timeout: Duration,
    idle_timeout: Duration,
    active: DashMap<RequestId, CancellationToken>,
}

/// Request-scoped state carried through the task.
struct Job {
    request_id: RequestId,
    message: IncomingMessage,
    descriptor: MessageDescriptor,
    fsm: RequestFsm,
    trace: PerformanceTrace,
    stop: CancellationToken,
    path: Option<ResponsePath>,
    tier: Option<RouteTier>,
}

/// Removes a request from the active set however its task ends.
struct Registration<'a> {
    active: &'a DashMap<RequestId, CancellationToken>,
    request_id: RequestId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.request_id);
    }
}

fn failure(error: &ChatlineError) -> Termination {
    Termination::Failed {
        kind: error.kind(),
        message: error.to_string(),
    }
}

impl Orchestrator {
    pub fn new(config: &ChatlineConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            classification,
            pool,
            cache,
            history,
            telemetry,
        } = collaborators;

        info!(
            pool_capacity = pool.capacity(),
            cache_capacity = cache.capacity(),
            "orchestrator initialized"
        );

        Self {
            preprocessor: Preprocessor::new(&config.preprocess),
            classifier: Classifier::new(&config.classifier, Arc::clone(&classification)),
            classification,
            optimizer: ParameterOptimizer::new(config.routing.clone()),
            prompts: PromptBuilder::new(&config.generation),
            cache,
            cache_context_turns: config.cache.context_turns,
            pool,
            history,
            telemetry,
            streaming: config.streaming.clone(),
            first_token_timeout: config.generation.first_token_timeout(),
            idle_timeout: config.generation.idle_timeout(),
            active: DashMap::new(),
        }
    }

    /// Accept a message and start answering it.
    ///
    /// Validation happens before this returns: an invalid message yields a
    /// [`ChatlineError::Validation`] and touches no backend. Otherwise the
    /// returned stream delivers the response and ends with one final chunk.
    pub fn submit(self: &Arc<Self>, message: IncomingMessage) -> Result<ResponseStream, ChatlineError> {
        let request_id = RequestId(uuid::Uuid::new_v4().to_string());
        let mut trace = PerformanceTrace::start();
        trace.checkpoint(checkpoints::REQUEST_RECEIVED);
        let mut fsm = RequestFsm::new(request_id.clone());

        let descriptor = match self.preprocessor.preprocess(&message.text) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                fsm.advance(RequestState::Failed);
                debug!(request_id = %request_id, error = %e, "message rejected");
                let error = ChatlineError::from(e);
                let report = trace.report(request_id, None, None, failure(&error));
                self.telemetry.record(&report);
                return Err(error);
            }
        };
        trace.checkpoint(checkpoints::MESSAGE_PREPROCESSED);
        fsm.advance(RequestState::Validated);

        let stop = CancellationToken::new();
        let (emitter, stream) = emitter::channel(request_id.clone(), stop.clone(), &self.streaming);
        self.active.insert(request_id.clone(), stop.clone());

        let span = info_span!("request", request_id = %request_id);
        let job = Job {
            request_id,
            message,
            descriptor,
            fsm,
            trace,
            stop,
            path: None,
            tier: None,
        };
        tokio::spawn(Arc::clone(self).drive(job, emitter).instrument(span));

        Ok(stream)
    }

    /// Stop an in-flight request. Returns false when the request is unknown
    /// or already finished.
    pub fn stop(&self, request_id: &RequestId) -> bool {
        match self.active.get(request_id) {
            Some(token) => {
                token.cancel();
                info!(request_id = %request_id, "stop requested");
                true
            }
            None => false,
        }
    }

    /// Stop every in-flight request.
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for entry in self.active.iter() {
            entry.value().cancel();
            stopped += 1;
        }
        stopped
    }

    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        info!(removed, "response cache cleared");
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Health of the classification backend and the history store.
    pub async fn component_health(&self) -> Vec<ComponentHealth> {
        vec![
            check_adapter(self.classification.as_ref()).await,
            check_adapter(self.history.as_ref()).await,
        ]
    }

    async fn drive(self: Arc<Self>, mut job: Job, emitter: Emitter) {
        let _registration = Registration {
            active: &self.active,
            request_id: job.request_id.clone(),
        };

        let (termination, reply) = self.respond(&mut job, emitter).await;
        job.trace.checkpoint(checkpoints::STREAMING_COMPLETE);
        job.fsm.advance(match termination {
            Termination::Failed { .. } => RequestState::Failed,
            _ => RequestState::Completed,
        });

        if termination.is_success() {
            self.record_turns(&job, reply).await;
        }

        let Job {
            request_id,
            trace,
            path,
            tier,
            ..
        } = job;
        let report = trace.report(request_id, path, tier, termination);
        info!(
            path = ?report.path,
            tier = ?report.tier,
            total_ms = report.total.as_millis() as u64,
            success = report.termination.is_success(),
            "request finished"
        );
        self.telemetry.record(&report);
    }

    /// Run the decision tree. Returns how the stream ended and the reply text
    /// that was delivered.
    async fn respond(&self, job: &mut Job, emitter: Emitter) -> (Termination, String) {
        if let Some(reply) = job.descriptor.quick_reply.clone() {
            job.fsm.advance(RequestState::QuickReply);
            job.path = Some(ResponsePath::QuickReply);
            job.trace.checkpoint(checkpoints::RESPONSE_OBTAINED);
            job.fsm.advance(RequestState::Streaming);
            emitter.complete_with(reply.clone()).await;
            return (Termination::Completed, reply);
        }

        job.fsm.advance(RequestState::Routing);
        let key = CacheKey::derive(
            &job.descriptor.normalized_text,
            &job.message.context,
            self.cache_context_turns,
            job.message.language,
        );
        let history = join_history(self.spawn_history_load(&job.message))
            .boxed()
            .shared();
        job.trace.checkpoint(checkpoints::LOOKUP_DISPATCHED);
        let mut cached = self.cache.get(&key);
        job.trace.checkpoint(checkpoints::CACHE_OUTCOME);

        // The key covers the client context only. Stored history can replace
        // it in the prompt, so a conversation's hit waits for the load.
        if cached.is_some() && job.message.conversation_id.is_some() {
            let loaded = history.clone().await;
            if !keyed_context(&loaded, &job.message.context) {
                debug!(
                    key = %key,
                    turns = loaded.len(),
                    "stored history not covered by key, ignoring hit"
                );
                cached = None;
            }
        }

        if let Some(reply) = cached {
            debug!(key = %key, "cache hit");
            job.fsm.advance(RequestState::CacheHit);
            job.path = Some(ResponsePath::CacheHit);
            job.trace.checkpoint(checkpoints::RESPONSE_OBTAINED);
            job.fsm.advance(RequestState::Streaming);
            emitter.complete_with(reply.clone()).await;
            let loaded = history.await;
            debug!(turns = loaded.len(), "history loaded after cache hit");
            return (Termination::Completed, reply);
        }

        debug!(key = %key, "cache miss");
        let loaded = history.await;
        let cacheable = keyed_context(&loaded, &job.message.context);
        let history = if loaded.is_empty() {
            job.message.context.clone()
        } else {
            loaded
        };

        job.fsm.advance(RequestState::Generating);
        job.path = Some(ResponsePath::Generated);
        let mut emitter = emitter;
        let (termination, reply) = self.generate(job, &history, &mut emitter).await;

        if termination.is_success() && !reply.is_empty() && cacheable {
            self.cache.put(key, reply.clone());
            job.trace.checkpoint(checkpoints::CACHE_UPDATED);
        }
        emitter.finish(termination.clone()).await;
        (termination, reply)
    }

    /// Classify, plan, lease and stream. The lease is released before this
    /// returns, so the connection is free before the final chunk goes out.
    async fn generate(
        &self,
        job: &mut Job,
        history: &[Turn],
        emitter: &mut Emitter,
    ) -> (Termination, String) {
        let stop = job.stop.clone();
        if stop.is_cancelled() {
            return (Termination::Cancelled, String::new());
        }

        let classification = tokio::select! {
            biased;
            _ = stop.cancelled() => return (Termination::Cancelled, String::new()),
            classification = self.classifier.classify(&job.descriptor) => classification,
        };
        let plan = self.optimizer.plan(&classification, &job.descriptor);
        job.tier = Some(plan.tier);
        job.trace.checkpoint(checkpoints::PLAN_BUILT);

        let mut lease = tokio::select! {
            biased;
            _ = stop.cancelled() => return (Termination::Cancelled, String::new()),
            acquired = self.pool.acquire() => match acquired {
                Ok(lease) => lease,
                Err(e) => {
                    warn!(error = %e, "no backend connection available");
                    return (failure(&e), String::new());
                }
            },
        };
        debug!(slot = lease.slot(), backend = plan.backend_id.as_str(), "backend leased");

        let request = self.prompts.build(
            plan,
            &job.descriptor,
            history,
            job.message.language,
            job.message.memory_mode,
        );
        // Opening the stream and the first delta share one first-token budget.
        let first_token_deadline = Instant::now() + self.first_token_timeout;
        let opened = tokio::select! {
            biased;
            _ = stop.cancelled() => return (Termination::Cancelled, String::new()),
            opened = timeout_at(
                first_token_deadline,
                lease.generate(request, stop.child_token()),
            ) => opened,
        };
        let mut deltas = match opened {
            Ok(Ok(deltas)) => deltas,
            Ok(Err(e)) => {
                warn!(error = %e, "generation failed to start");
                lease.mark_broken();
                return (failure(&e), String::new());
            }
            Err(_) => {
                let e = ChatlineError::Timeout {
                    duration: self.first_token_timeout,
                };
                warn!(error = %e, "generation failed to start");
                lease.mark_broken();
                return (failure(&e), String::new());
            }
        };

        let mut reply = String::new();
        let mut first = true;
        let mut wait = self.first_token_timeout;
        let mut deadline = first_token_deadline;
        let termination = loop {
            let flush_at = emitter.flush_deadline();
            tokio::select! {
                biased;
                _ = stop.cancelled() => break Termination::Cancelled,
                _ = sleep_until(flush_at.unwrap_or(deadline)), if flush_at.is_some() => {
                    if let Some(end) = interrupted(emitter.flush().await, &stop) {
                        break end;
                    }
                }
                next = timeout_at(deadline, deltas.next()) => match next {
                    Ok(Some(Ok(delta))) => {
                        if first {
                            first = false;
                            job.trace.checkpoint(checkpoints::RESPONSE_OBTAINED);
                            job.fsm.advance(RequestState::Streaming);
                        }
                        wait = self.idle_timeout;
                        deadline = Instant::now() + wait;
                        reply.push_str(&delta);
                        if let Some(end) = interrupted(emitter.send(&delta).await, &stop) {
                            break end;
                        }
                    }
                    Ok(Some(Err(e))) => {
                        warn!(error = %e, "generation stream failed");
                        lease.mark_broken();
                        break failure(&e);
                    }
                    Ok(None) => {
                        if first {
                            job.trace.checkpoint(checkpoints::RESPONSE_OBTAINED);
                        }
                        break Termination::Completed;
                    }
                    Err(_) => {
                        let e = ChatlineError::Timeout { duration: wait };
                        warn!(error = %e, "generation stalled");
                        lease.mark_broken();
                        break failure(&e);
                    }
                },
            }
        };

        if termination == Termination::Cancelled {
            info!(delivered_chars = reply.chars().count(), "generation stopped");
        }
        drop(deltas);
        lease.release();
        (termination, reply)
    }

    fn spawn_history_load(&self, message: &IncomingMessage) -> JoinHandle<Vec<Turn>> {
        let store = Arc::clone(&self.history);
        let user_id = message.user_id.clone();
        let conversation_id = message.conversation_id.clone();
        tokio::spawn(
            async move {
                let Some(conversation_id) = conversation_id else {
                    return Vec::new();
                };
                match store.load(&user_id, &conversation_id).await {
                    Ok(turns) => turns,
                    Err(e) => {
                        warn!(
                            error = %e,
                            conversation_id = conversation_id.0.as_str(),
                            "history load failed, continuing without history"
                        );
                        Vec::new()
                    }
                }
            }
            .in_current_span(),
        )
    }

    /// Append the user and assistant turns of a completed exchange.
    async fn record_turns(&self, job: &Job, reply: String) {
        let Some(conversation_id) = job.message.conversation_id.as_ref() else {
            return;
        };
        let turns = [
            Turn::user(job.descriptor.normalized_text.clone()),
            Turn::assistant(reply),
        ];
        for turn in turns {
            if let Err(e) = self.history.append(conversation_id, turn).await {
                warn!(
                    error = %e,
                    conversation_id = conversation_id.0.as_str(),
                    "history append failed"
                );
                return;
            }
        }
    }
}

async fn check_adapter<A: PluginAdapter + ?Sized>(adapter: &A) -> ComponentHealth {
    let status = match adapter.health_check().await {
        Ok(status) => status,
        Err(e) => HealthStatus::Unhealthy(e.to_string()),
    };
    ComponentHealth {
        name: adapter.name().to_string(),
        adapter_type: adapter.adapter_type(),
        status,
    }
}

/// Whether a prompt built from `loaded` history matches what the cache key
/// was derived from.
fn keyed_context(loaded: &[Turn], context: &[Turn]) -> bool {
    loaded.is_empty() || loaded == context
}

/// How a failed delivery ends the generation loop, if it does.
fn interrupted(sent: Result<(), EmitError>, stop: &CancellationToken) -> Option<Termination> {
    match sent {
        Ok(()) => None,
        Err(EmitError::Stopped) => Some(Termination::Cancelled),
        Err(EmitError::Closed) => {
            debug!("consumer went away, stopping generation");
            stop.cancel();
            Some(Termination::Cancelled)
        }
    }
}

async fn join_history(handle: JoinHandle<Vec<Turn>>) -> Vec<Turn> {
    match handle.await {
        Ok(turns) => turns,
        Err(e) => {
            warn!(error = %e, "history task failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_kind_and_message() {
        let termination = failure(&ChatlineError::BackendBusy {
            waited: Duration::from_secs(10),
        });
        match termination {
            Termination::Failed { kind, message } => {
                assert_eq!(kind, chatline_core::ErrorKind::BackendBusy);
                assert!(!message.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
