use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::message::{Message, Metadata};

/// API error rendered as a protocol-level `structured/error` message
///
/// Whatever correlation metadata could be recovered from the rejected
/// request is echoed so the sender can still match the reply.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: String,
    pub message: String,
    pub correlation: Metadata,
}

impl ApiError {
    /// Creates a new API error
    pub fn new(status: StatusCode, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            kind: kind.into(),
            message: message.into(),
            correlation: Metadata::new(),
        }
    }

    /// Creates a 400 error for an envelope that is not a valid message
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_message_shape", message)
    }

    pub fn with_correlation(mut self, correlation: Metadata) -> Self {
        self.correlation = correlation;
        self
    }

    /// The error as the message body sent back to the client
    pub fn to_message(&self) -> Message {
        Message::failure(&self.kind, self.message.clone(), None).with_correlation(&self.correlation)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(self.to_message());
        (self.status, body).into_response()
    }
}
