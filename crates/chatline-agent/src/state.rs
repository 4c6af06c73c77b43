// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request FSM.
//!
//! Every request goes Received -> Validated, then either QuickReply or
//! Routing. Routing ends in CacheHit or Generating. All answering paths pass
//! through Streaming before Completed. Failed is reachable from anywhere
//! that is not already terminal.

use tracing::{debug, warn};

use chatline_core::RequestId;

/// States in the request FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Message accepted at the boundary.
    Received,
    /// Preprocessing succeeded.
    Validated,
    /// A canned reply matched.
    QuickReply,
    /// Cache lookup and history load in flight.
    Routing,
    /// A cached reply will be replayed.
    CacheHit,
    /// Classifying, planning, leasing and calling the backend.
    Generating,
    /// Chunks are flowing to the caller.
    Streaming,
    Completed,
    Failed,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Received => write!(f, "received"),
            RequestState::Validated => write!(f, "validated"),
            RequestState::QuickReply => write!(f, "quick_reply"),
            RequestState::Routing => write!(f, "routing"),
            RequestState::CacheHit => write!(f, "cache_hit"),
            RequestState::Generating => write!(f, "generating"),
            RequestState::Streaming => write!(f, "streaming"),
            RequestState::Completed => write!(f, "completed"),
            RequestState::Failed => write!(f, "failed"),
        }
    }
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Failed)
    }

    /// Stop signals are only honoured while the backend is involved.
    pub fn accepts_stop(self) -> bool {
        matches!(self, RequestState::Generating | RequestState::Streaming)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Received, Validated)
                | (Validated, QuickReply)
                | (Validated, Routing)
                | (Routing, CacheHit)
                | (Routing, Generating)
                | (QuickReply, Streaming)
                | (CacheHit, Streaming)
                | (Generating, Streaming)
                // Cancelled or empty generations finish without streaming.
                | (Generating, Completed)
                | (Streaming, Completed)
        )
    }
}

/// Tracks the state of one request and logs every transition.
#[derive(Debug)]
pub struct RequestFsm {
    request_id: RequestId,
    state: RequestState,
}

impl RequestFsm {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: RequestState::Received,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move to `next`. Illegal transitions are logged and ignored so a
    /// bookkeeping mistake never takes a request down.
    pub fn advance(&mut self, next: RequestState) {
        if self.state.can_transition_to(next) {
            debug!(
                request_id = %self.request_id,
                from = %self.state,
                to = %next,
                "request state transition"
            );
            self.state = next;
        } else {
            warn!(
                request_id = %self.request_id,
                from = %self.state,
                to = %next,
                "illegal request state transition ignored"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fsm() -> RequestFsm {
        RequestFsm::new(RequestId("req-1".into()))
    }

    #[test]
    fn state_display() {
        assert_eq!(RequestState::QuickReply.to_string(), "quick_reply");
        assert_eq!(RequestState::Generating.to_string(), "generating");
        assert_eq!(RequestState::Completed.to_string(), "completed");
    }

    #[test]
    fn generated_path_walks_to_completed() {
        let mut fsm = fsm();
        for next in [
            RequestState::Validated,
            RequestState::Routing,
            RequestState::Generating,
            RequestState::Streaming,
            RequestState::Completed,
        ] {
            fsm.advance(next);
            assert_eq!(fsm.state(), next);
        }
    }

    #[test]
    fn illegal_transition_is_ignored() {
        let mut fsm = fsm();
        fsm.advance(RequestState::Streaming);
        assert_eq!(fsm.state(), RequestState::Received);
    }

    #[test]
    fn failed_is_reachable_until_terminal() {
        for state in [
            RequestState::Received,
            RequestState::Routing,
            RequestState::Generating,
            RequestState::Streaming,
        ] {
            assert!(state.can_transition_to(RequestState::Failed));
        }
        assert!(!RequestState::Completed.can_transition_to(RequestState::Failed));
        assert!(!RequestState::Failed.can_transition_to(RequestState::Completed));
    }

    #[test]
    fn quick_reply_never_routes() {
        assert!(!RequestState::QuickReply.can_transition_to(RequestState::Routing));
        assert!(!RequestState::QuickReply.can_transition_to(RequestState::Generating));
    }

    #[test]
    fn stop_only_accepted_while_generating_or_streaming() {
        assert!(RequestState::Generating.accepts_stop());
        assert!(RequestState::Streaming.accepts_stop());
        assert!(!RequestState::Routing.accepts_stop());
        assert!(!RequestState::CacheHit.accepts_stop());
        assert!(!RequestState::QuickReply.accepts_stop());
    }
}
