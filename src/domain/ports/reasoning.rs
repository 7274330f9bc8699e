use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::weather::WeatherAction;

/// One unit of delegable work: a single action against a single location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    pub action: WeatherAction,
    pub location: String,
}

impl SubtaskSpec {
    pub fn new(action: WeatherAction, location: impl Into<String>) -> Self {
        Self {
            action,
            location: location.into(),
        }
    }
}

/// What a worker was asked to do, extracted from free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: WeatherAction,
    pub targets: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("No actionable request found: {0}")]
    NotActionable(String),

    #[error("Reasoning engine failure: {0}")]
    Engine(String),
}

/// Reasoning engine behind the agents
///
/// Keeps the delegation core independent of any particular LLM or parser.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Splits a compound query into ordered subtasks; may return none
    async fn decompose(&self, query: &str) -> Result<Vec<SubtaskSpec>, ReasoningError>;

    /// Extracts a single actionable intent from a delegated request
    async fn interpret(&self, text: &str) -> Result<Intent, ReasoningError>;
}
