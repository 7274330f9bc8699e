use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::errors::{AgentError, AgentResult};
use super::state::{RequestPhase, RequestState};
use super::types::{SubtaskRequest, TargetResult, WorkerReport};
use crate::domain::message::{Content, Message};
use crate::domain::ports::{CapabilityError, Reasoner, WeatherCapability};
use crate::domain::weather::{Coordinates, Target, WeatherAction};

/// Worker Agent that executes delegated weather lookups
///
/// Accepts a typed `structured/json` subtask, free text, or a
/// `location/coordinates` point, runs the capability once per target and
/// replies with a per-target report. Content it cannot act on produces an
/// `unparsable_request` error reply, never a transport fault.
pub struct WorkerAgent {
    name: String,
    capability: Arc<dyn WeatherCapability>,
    reasoner: Arc<dyn Reasoner>,
    max_concurrency: usize,
}

/// Capability calls in flight at once for one request
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

impl WorkerAgent {
    pub fn new(
        name: impl Into<String>,
        capability: Arc<dyn WeatherCapability>,
        reasoner: Arc<dyn Reasoner>,
    ) -> Self {
        Self {
            name: name.into(),
            capability,
            reasoner,
            max_concurrency: DEFAULT_WORKER_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handles one request; every path ends in a reply message
    #[instrument(skip(self, request), fields(agent = %self.name, correlation_id = request.correlation_id().unwrap_or("-")))]
    pub async fn handle(&self, request: &Message) -> Message {
        let mut state = RequestState::new(request.correlation_id().map(str::to_string));

        match self.process(request, &mut state).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, phase = %state.phase(), "worker request failed");
                state.fail();
                request
                    .reply_failure(err.kind(), err.to_string(), None)
                    .with_metadata("agent", self.name.clone())
            }
        }
    }

    async fn process(&self, request: &Message, state: &mut RequestState) -> AgentResult<Message> {
        state.advance(RequestPhase::Parsing)?;
        let task = self.parse(request.content()).await?;

        state.advance(RequestPhase::Executing)?;
        info!(action = %task.action, targets = task.locations.len(), "executing delegated request");
        let pending: Vec<_> = task
            .locations
            .iter()
            .map(|location| self.execute(task.action, location))
            .collect();
        let results: Vec<TargetResult> = stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        state.advance(RequestPhase::Replying)?;
        let report = WorkerReport {
            action: task.action,
            results,
        };
        let reply = request
            .reply(report.to_content()?)?
            .with_metadata("agent", self.name.clone());

        state.advance(RequestPhase::Done)?;
        Ok(reply)
    }

    /// Extracts the action and targets from whatever content arrived
    async fn parse(&self, content: &Content) -> AgentResult<SubtaskRequest> {
        match content {
            Content::Structured(map) => SubtaskRequest::from_map(map),
            Content::Text { text, .. } => {
                let intent = self.reasoner.interpret(text).await?;
                if intent.targets.is_empty() {
                    return Err(AgentError::UnparsableRequest(format!(
                        "no location found in '{}'",
                        text
                    )));
                }
                Ok(SubtaskRequest {
                    action: intent.action,
                    locations: intent.targets,
                })
            }
            Content::Coordinates {
                latitude,
                longitude,
            } => Ok(SubtaskRequest {
                action: WeatherAction::Forecast,
                locations: vec![format!("{},{}", latitude, longitude)],
            }),
            Content::Error(_) | Content::Binary { .. } => Err(AgentError::UnparsableRequest(
                format!(
                    "cannot act on {}/{} content",
                    content.format(),
                    content.subformat()
                ),
            )),
        }
    }

    /// Runs the capability for one target; failures stay local to the target
    async fn execute(&self, action: WeatherAction, location: &str) -> TargetResult {
        let location = location.trim();
        let Some(target) = Target::resolve(location) else {
            return TargetResult::failed(
                location,
                CapabilityError::UnsupportedTarget(location.to_string()).to_string(),
            );
        };

        let outcome = match action {
            WeatherAction::Alerts => match target.state() {
                Some(state) => self.capability.alerts(state).await.map(|alerts| {
                    json!({
                        "state": state.code,
                        "name": state.name,
                        "count": alerts.len(),
                        "alerts": alerts,
                    })
                }),
                None => Err(CapabilityError::UnsupportedTarget(format!(
                    "{} (alerts require a US state)",
                    location
                ))),
            },
            WeatherAction::Forecast => {
                let point: Coordinates = target.coordinates();
                self.capability.forecast(point).await.map(|periods| {
                    json!({
                        "latitude": point.latitude,
                        "longitude": point.longitude,
                        "periods": periods,
                    })
                })
            }
        };

        match outcome {
            Ok(data) => TargetResult::ok(location, data),
            Err(err) => {
                warn!(target = location, error = %err, "capability call failed");
                TargetResult::failed(location, err.to_string())
            }
        }
    }
}
