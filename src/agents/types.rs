use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{AgentError, AgentResult};
use crate::domain::message::{Content, ErrorPayload};
use crate::domain::ports::SubtaskSpec;
use crate::domain::weather::WeatherAction;

fn into_map<T: Serialize>(value: &T) -> AgentResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AgentError::UnparsableRequest(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Typed request a Coordinator sends to a Worker (`structured/json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskRequest {
    pub action: WeatherAction,
    pub locations: Vec<String>,
}

impl SubtaskRequest {
    pub fn from_map(map: &Map<String, Value>) -> AgentResult<Self> {
        let request: SubtaskRequest = serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| AgentError::UnparsableRequest(format!("unrecognized request: {}", e)))?;
        if request.locations.iter().all(|l| l.trim().is_empty()) {
            return Err(AgentError::UnparsableRequest(
                "request names no locations".to_string(),
            ));
        }
        Ok(request)
    }

    pub fn to_content(&self) -> AgentResult<Content> {
        Ok(Content::Structured(into_map(self)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Ok,
    Failed,
}

/// Worker-side result for one requested target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: String,
    pub status: TargetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl TargetResult {
    pub fn ok(target: impl Into<String>, data: Value) -> Self {
        Self {
            target: target.into(),
            status: TargetStatus::Ok,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            error: Some(ErrorPayload {
                kind: "capability_failure".to_string(),
                message: reason.into(),
                target: Some(target.clone()),
            }),
            target,
            status: TargetStatus::Failed,
            data: None,
        }
    }
}

/// Body of a Worker reply: one result per requested target, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub action: WeatherAction,
    pub results: Vec<TargetResult>,
}

impl WorkerReport {
    pub fn to_content(&self) -> AgentResult<Content> {
        Ok(Content::Structured(into_map(self)?))
    }
}

/// A decomposed unit of work with its position in the original query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub index: usize,
    pub spec: SubtaskSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// Coordinator-side record of what happened to one subtask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskOutcome {
    pub index: usize,
    pub action: WeatherAction,
    pub location: String,
    pub status: OutcomeStatus,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl SubtaskOutcome {
    pub fn succeeded(subtask: &Subtask, result: Value, attempts: u32) -> Self {
        Self {
            index: subtask.index,
            action: subtask.spec.action,
            location: subtask.spec.location.clone(),
            status: OutcomeStatus::Succeeded,
            attempts,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(subtask: &Subtask, kind: &str, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            index: subtask.index,
            action: subtask.spec.action,
            location: subtask.spec.location.clone(),
            status: OutcomeStatus::Failed,
            attempts,
            result: None,
            error: Some(ErrorPayload {
                kind: kind.to_string(),
                message: message.into(),
                target: Some(subtask.spec.location.clone()),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }
}

/// Final answer of a Coordinator: one outcome per decomposed subtask, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub query: String,
    pub subtasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<SubtaskOutcome>,
    pub summary: String,
}

impl AggregatedReport {
    pub fn new(query: impl Into<String>, outcomes: Vec<SubtaskOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - succeeded;
        let summary = summarize(&outcomes, succeeded);

        Self {
            query: query.into(),
            subtasks: outcomes.len(),
            succeeded,
            failed,
            outcomes,
            summary,
        }
    }

    /// Report for a query that yielded nothing to delegate
    pub fn nothing_delegated(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            subtasks: 0,
            succeeded: 0,
            failed: 0,
            outcomes: Vec::new(),
            summary: "No actionable weather request found; nothing was delegated".to_string(),
        }
    }

    pub fn outcome_for(&self, location: &str) -> Option<&SubtaskOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.location.eq_ignore_ascii_case(location))
    }

    pub fn to_content(&self) -> AgentResult<Content> {
        Ok(Content::Structured(into_map(self)?))
    }

    pub fn from_content(content: &Content) -> AgentResult<Self> {
        match content {
            Content::Structured(map) => Ok(serde_json::from_value(Value::Object(map.clone()))?),
            other => Err(AgentError::UnparsableRequest(format!(
                "expected structured/json report, got {}/{}",
                other.format(),
                other.subformat()
            ))),
        }
    }
}

fn summarize(outcomes: &[SubtaskOutcome], succeeded: usize) -> String {
    let mut lines = vec![format!(
        "{} of {} subtasks succeeded",
        succeeded,
        outcomes.len()
    )];
    for outcome in outcomes {
        let line = match &outcome.error {
            None => format!("{} ({}): ok", outcome.location, outcome.action),
            Some(err) => format!(
                "{} ({}): failed [{}] {}",
                outcome.location, outcome.action, err.kind, err.message
            ),
        };
        lines.push(line);
    }
    lines.join("\n")
}
