use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, Json};
use tracing::info;

use crate::agents::{CoordinatorAgent, WorkerAgent};
use crate::api::middleware::NlipMessage;
use crate::domain::message::Message;

/// An agent that answers every protocol message with a reply message
#[async_trait]
pub trait NlipAgent: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn handle(&self, request: &Message) -> Message;
}

#[async_trait]
impl NlipAgent for CoordinatorAgent {
    fn name(&self) -> &str {
        CoordinatorAgent::name(self)
    }

    async fn handle(&self, request: &Message) -> Message {
        CoordinatorAgent::handle(self, request).await
    }
}

#[async_trait]
impl NlipAgent for WorkerAgent {
    fn name(&self) -> &str {
        WorkerAgent::name(self)
    }

    async fn handle(&self, request: &Message) -> Message {
        WorkerAgent::handle(self, request).await
    }
}

/// Receive a protocol message and reply
///
/// POST /nlip/
///
/// Semantic failures are reported inside the reply body; only a malformed
/// envelope is rejected with a non-2xx status (by [`NlipMessage`]).
pub async fn receive<A: NlipAgent>(
    State(agent): State<Arc<A>>,
    NlipMessage(request): NlipMessage,
) -> Json<Message> {
    info!(
        agent = agent.name(),
        format = %request.format(),
        subformat = request.subformat(),
        correlation_id = request.correlation_id().unwrap_or("-"),
        "message received"
    );

    let reply = agent.handle(&request).await;

    info!(
        agent = agent.name(),
        error = reply.is_error(),
        correlation_id = reply.correlation_id().unwrap_or("-"),
        "reply sent"
    );
    Json(reply)
}
