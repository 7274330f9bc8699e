use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::errors::{AgentError, AgentResult};
use super::types::{
    AggregatedReport, Subtask, SubtaskOutcome, SubtaskRequest, TargetStatus, WorkerReport,
};
use crate::domain::message::{Content, Message};
use crate::domain::ports::{
    Endpoint, Reasoner, ReasoningError, SubtaskSpec, Transport, TransportError,
};

/// Limits applied when delegating subtasks
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationPolicy {
    /// Bound on a single attempt's round trip
    pub timeout: Duration,
    /// Extra attempts after an `Unreachable` or `Timeout` failure
    pub max_retries: u32,
    /// Base delay between attempts, multiplied by the attempt number
    pub retry_backoff: Duration,
    /// Subtasks beyond this many are reported as skipped
    pub max_subtasks: usize,
    /// Subtasks in flight at once
    pub max_concurrency: usize,
}

impl Default for DelegationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 1,
            retry_backoff: Duration::from_millis(250),
            max_subtasks: 16,
            max_concurrency: 8,
        }
    }
}

/// Coordinator Agent: decomposes a query, delegates subtasks, aggregates replies
///
/// Subtask failures never abort the request; only a query that cannot be
/// decomposed at all produces an error reply.
pub struct CoordinatorAgent {
    name: String,
    worker: Endpoint,
    transport: Arc<dyn Transport>,
    reasoner: Arc<dyn Reasoner>,
    policy: DelegationPolicy,
}

impl CoordinatorAgent {
    pub fn new(
        name: impl Into<String>,
        worker: Endpoint,
        transport: Arc<dyn Transport>,
        reasoner: Arc<dyn Reasoner>,
    ) -> Self {
        Self {
            name: name.into(),
            worker,
            transport,
            reasoner,
            policy: DelegationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DelegationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &DelegationPolicy {
        &self.policy
    }

    /// Handles one user request; every path ends in a reply message
    #[instrument(skip(self, request), fields(agent = %self.name, correlation_id = request.correlation_id().unwrap_or("-")))]
    pub async fn handle(&self, request: &Message) -> Message {
        let reply = self
            .coordinate(request)
            .await
            .and_then(|report| Ok(request.reply(report.to_content()?)?));

        match reply {
            Ok(reply) => reply.with_metadata("agent", self.name.clone()),
            Err(err) => {
                warn!(error = %err, "request could not be decomposed");
                request
                    .reply_failure(err.kind(), err.to_string(), None)
                    .with_metadata("agent", self.name.clone())
            }
        }
    }

    /// Decomposes, dispatches and aggregates, returning the structured report
    pub async fn coordinate(&self, request: &Message) -> AgentResult<AggregatedReport> {
        let query = extract_query(request.content())?;
        let specs = match self.reasoner.decompose(&query).await {
            Ok(specs) => dedupe(specs),
            Err(ReasoningError::NotActionable(reason)) => {
                debug!(reason = %reason, "reasoner found nothing actionable");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        if specs.is_empty() {
            info!(query = %query, "nothing to delegate");
            return Ok(AggregatedReport::nothing_delegated(query));
        }

        let subtasks: Vec<Subtask> = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| Subtask { index, spec })
            .collect();
        let total = subtasks.len();
        info!(subtasks = total, worker = %self.worker, "delegating subtasks");

        let mut slots: Vec<Option<SubtaskOutcome>> = vec![None; total];
        let mut dispatch = Vec::with_capacity(total.min(self.policy.max_subtasks));
        for subtask in subtasks {
            if subtask.index < self.policy.max_subtasks {
                dispatch.push(subtask);
            } else {
                slots[subtask.index] = Some(SubtaskOutcome::failed(
                    &subtask,
                    "skipped",
                    format!("exceeds fan-out limit of {}", self.policy.max_subtasks),
                    0,
                ));
            }
        }

        let mut in_flight = stream::iter(dispatch)
            .map(|subtask| self.run_subtask(request, subtask))
            .buffer_unordered(self.policy.max_concurrency.max(1));

        while let Some(outcome) = in_flight.next().await {
            let index = outcome.index;
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<SubtaskOutcome> = slots.into_iter().flatten().collect();
        debug_assert_eq!(outcomes.len(), total);

        let report = AggregatedReport::new(query, outcomes);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "aggregation complete"
        );
        Ok(report)
    }

    /// Builds the message delegated to the worker for one subtask
    pub fn subtask_message(&self, parent: &Message, subtask: &Subtask) -> AgentResult<Message> {
        let request = SubtaskRequest {
            action: subtask.spec.action,
            locations: vec![subtask.spec.location.clone()],
        };

        let mut message = Message::new(request.to_content()?, Default::default())?
            .with_metadata("correlation_id", Uuid::new_v4().to_string())
            .with_metadata("agent", self.name.clone());
        if let Some(session_id) = parent.session_id() {
            message = message.with_metadata("session_id", session_id);
        }
        if let Some(parent_id) = parent.correlation_id() {
            message = message.with_metadata("parent_id", parent_id);
        }
        Ok(message)
    }

    async fn run_subtask(&self, parent: &Message, subtask: Subtask) -> SubtaskOutcome {
        let message = match self.subtask_message(parent, &subtask) {
            Ok(message) => message,
            Err(err) => return SubtaskOutcome::failed(&subtask, err.kind(), err.to_string(), 0),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(
                index = subtask.index,
                location = %subtask.spec.location,
                attempt = attempts,
                "dispatching subtask"
            );

            match self.send_once(&message).await {
                Ok(reply) => return outcome_from_reply(&subtask, &reply, attempts),
                Err(err) if err.is_retryable() && attempts <= self.policy.max_retries => {
                    warn!(
                        index = subtask.index,
                        error = %err,
                        attempt = attempts,
                        "subtask attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_backoff * attempts).await;
                }
                Err(err) => {
                    warn!(index = subtask.index, error = %err, "subtask failed");
                    return SubtaskOutcome::failed(&subtask, err.kind(), err.to_string(), attempts);
                }
            }
        }
    }

    /// One attempt, bounded by the policy timeout even if the transport is not
    async fn send_once(&self, message: &Message) -> Result<Message, TransportError> {
        let timeout = self.policy.timeout;
        tokio::time::timeout(timeout, self.transport.send(&self.worker, message, timeout))
            .await
            .unwrap_or(Err(TransportError::Timeout(timeout)))
    }
}

/// Pulls the user's query out of the request content
fn extract_query(content: &Content) -> AgentResult<String> {
    let query = match content {
        Content::Text { text, .. } => text.trim().to_string(),
        Content::Structured(map) => map
            .get("query")
            .and_then(Value::as_str)
            .map(|q| q.trim().to_string())
            .ok_or_else(|| {
                AgentError::UnparsableRequest(
                    "structured request must carry a string 'query'".to_string(),
                )
            })?,
        other => {
            return Err(AgentError::UnparsableRequest(format!(
                "cannot decompose {}/{} content",
                other.format(),
                other.subformat()
            )))
        }
    };

    if query.is_empty() {
        return Err(AgentError::UnparsableRequest("query is empty".to_string()));
    }
    Ok(query)
}

/// Drops repeated (action, location) pairs, keeping first occurrence order
fn dedupe(specs: Vec<SubtaskSpec>) -> Vec<SubtaskSpec> {
    let mut seen = Vec::with_capacity(specs.len());
    let mut unique = Vec::with_capacity(specs.len());
    for spec in specs {
        let key = (spec.action, spec.location.trim().to_lowercase());
        if key.1.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        unique.push(spec);
    }
    unique
}

/// Interprets a worker reply as the outcome of one subtask
fn outcome_from_reply(subtask: &Subtask, reply: &Message, attempts: u32) -> SubtaskOutcome {
    match reply.content() {
        Content::Structured(map) if map.contains_key("results") => {
            let report: WorkerReport = match serde_json::from_value(Value::Object(map.clone())) {
                Ok(report) => report,
                Err(err) => {
                    return SubtaskOutcome::failed(
                        subtask,
                        "malformed_reply",
                        format!("unreadable worker report: {}", err),
                        attempts,
                    )
                }
            };

            match report.results.into_iter().next() {
                Some(result) if result.status == TargetStatus::Ok => SubtaskOutcome::succeeded(
                    subtask,
                    result.data.unwrap_or(Value::Null),
                    attempts,
                ),
                Some(result) => {
                    let message = result
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "capability call failed".to_string());
                    SubtaskOutcome::failed(subtask, "capability_failure", message, attempts)
                }
                None => SubtaskOutcome::failed(
                    subtask,
                    "malformed_reply",
                    "worker report has no results",
                    attempts,
                ),
            }
        }
        Content::Structured(map) => {
            SubtaskOutcome::succeeded(subtask, Value::Object(map.clone()), attempts)
        }
        Content::Text { text, .. } => SubtaskOutcome::succeeded(subtask, json!({ "text": text }), attempts),
        Content::Error(payload) => SubtaskOutcome::failed(
            subtask,
            "remote_error",
            format!("{}: {}", payload.kind, payload.message),
            attempts,
        ),
        other => SubtaskOutcome::succeeded(subtask, other.to_wire(), attempts),
    }
}
