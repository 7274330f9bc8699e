use thiserror::Error;

/// Errors raised while constructing or decoding a protocol message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Invalid message shape: {0}")]
    InvalidMessageShape(String),
}

impl MessageError {
    pub fn shape(reason: impl Into<String>) -> Self {
        MessageError::InvalidMessageShape(reason.into())
    }
}
