use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::message::Message;

/// Transport-level faults surfaced by [`Transport::send`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Remote agent reported {kind}: {message}")]
    RemoteError { kind: String, message: String },
}

impl TransportError {
    /// Stable snake_case name used in aggregated reports
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Unreachable(_) => "unreachable",
            TransportError::Timeout(_) => "timeout",
            TransportError::MalformedReply(_) => "malformed_reply",
            TransportError::RemoteError { .. } => "remote_error",
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable(_) | TransportError::Timeout(_)
        )
    }
}

/// Address of a remote agent's message endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// Delivers a message to a remote agent and awaits its reply
///
/// Exactly one round trip per call. Retries are the caller's decision.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &Endpoint,
        message: &Message,
        timeout: Duration,
    ) -> Result<Message, TransportError>;
}

/// Applies the reply contract shared by every transport
///
/// Error content becomes [`TransportError::RemoteError`]; a reply whose
/// correlation metadata differs from the request's is malformed.
pub fn check_reply(request: &Message, reply: Message) -> Result<Message, TransportError> {
    if let Some(payload) = reply.content().as_error() {
        return Err(TransportError::RemoteError {
            kind: payload.kind.clone(),
            message: payload.message.clone(),
        });
    }

    if reply.correlation() != request.correlation() {
        return Err(TransportError::MalformedReply(format!(
            "correlation mismatch: expected {:?}, got {:?}",
            request.correlation(),
            reply.correlation()
        )));
    }

    Ok(reply)
}
