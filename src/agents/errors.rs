use thiserror::Error;

use crate::domain::message::MessageError;
use crate::domain::ports::ReasoningError;

/// Errors that end a request as a whole
///
/// Per-target capability failures and per-subtask transport faults are not
/// errors at this level; they are recorded in the reply instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    InvalidMessageShape(#[from] MessageError),

    #[error("Unparsable request: {0}")]
    UnparsableRequest(String),

    #[error("Reasoning engine failure: {0}")]
    Reasoning(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl AgentError {
    /// Error kind written into `structured/error` replies
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidMessageShape(_) => "invalid_message_shape",
            AgentError::UnparsableRequest(_) => "unparsable_request",
            AgentError::Reasoning(_) => "reasoning_failure",
            AgentError::JsonError(_) => "unparsable_request",
            AgentError::InvalidStateTransition { .. } => "internal_error",
        }
    }
}

impl From<ReasoningError> for AgentError {
    fn from(err: ReasoningError) -> Self {
        match err {
            ReasoningError::NotActionable(reason) => AgentError::UnparsableRequest(reason),
            ReasoningError::Engine(reason) => AgentError::Reasoning(reason),
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
