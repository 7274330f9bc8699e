// Per-request phase tracking for the Worker Agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::{AgentError, AgentResult};

/// Lifecycle phase of a single request handled by a worker
///
/// # Phase Transitions
/// ```text
/// Received -> Parsing -> Executing -> Replying -> Done
///                └------> Failed <------┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPhase {
    Received,
    Parsing,
    Executing,
    Replying,
    Done,
    Failed,
}

impl RequestPhase {
    pub fn can_transition_to(&self, next: RequestPhase) -> bool {
        use RequestPhase::*;
        matches!(
            (self, next),
            (Received, Parsing)
                | (Parsing, Executing)
                | (Parsing, Failed)
                | (Executing, Replying)
                | (Replying, Done)
                | (Replying, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestPhase::Done | RequestPhase::Failed)
    }
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPhase::Received => write!(f, "received"),
            RequestPhase::Parsing => write!(f, "parsing"),
            RequestPhase::Executing => write!(f, "executing"),
            RequestPhase::Replying => write!(f, "replying"),
            RequestPhase::Done => write!(f, "done"),
            RequestPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Working state of one request; never shared between requests
#[derive(Debug, Clone)]
pub struct RequestState {
    correlation_id: Option<String>,
    phase: RequestPhase,
    received_at: DateTime<Utc>,
}

impl RequestState {
    pub fn new(correlation_id: Option<String>) -> Self {
        Self {
            correlation_id,
            phase: RequestPhase::Received,
            received_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Moves to `next`, rejecting transitions the phase graph does not allow
    pub fn advance(&mut self, next: RequestPhase) -> AgentResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(AgentError::InvalidStateTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }

        debug!(
            correlation_id = self.correlation_id.as_deref().unwrap_or("-"),
            from = %self.phase,
            to = %next,
            elapsed_ms = (Utc::now() - self.received_at).num_milliseconds(),
            "request phase transition"
        );
        self.phase = next;
        Ok(())
    }

    /// Marks the request failed if the current phase permits it
    pub fn fail(&mut self) {
        if self.advance(RequestPhase::Failed).is_err() {
            warn!(phase = %self.phase, "request failed outside a failable phase");
            self.phase = RequestPhase::Failed;
        }
    }
}
