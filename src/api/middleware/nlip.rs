use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::Value;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::domain::message::{correlation_of, Message, Metadata};

/// Validating extractor for protocol messages
///
/// Rejects anything that is not a well-formed message before a handler
/// runs, answering with an `invalid_message_shape` error reply.
///
/// Usage:
/// ```rust,ignore
/// async fn handler(NlipMessage(request): NlipMessage) -> Json<Message> {
///     Json(request)
/// }
/// ```
pub struct NlipMessage(pub Message);

#[async_trait]
impl<S> FromRequest<S> for NlipMessage
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_shape(format!("unreadable body: {}", e)))?;

        let raw: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::invalid_shape(format!("body is not JSON: {}", e)))?;
        let correlation = recover_correlation(&raw);

        let message: Message = serde_json::from_value(raw).map_err(|e| {
            debug!(error = %e, "rejecting malformed envelope");
            ApiError::invalid_shape(e.to_string()).with_correlation(correlation)
        })?;

        Ok(NlipMessage(message))
    }
}

/// Correlation keys from a raw body's `metadata`, if it has any
fn recover_correlation(raw: &Value) -> Metadata {
    raw.get("metadata")
        .and_then(Value::as_object)
        .map(|map| {
            let metadata: Metadata = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            correlation_of(&metadata)
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recovers_only_correlation_keys() {
        let raw = json!({
            "format": "video",
            "metadata": { "correlation_id": "c-1", "session_id": "s-1", "agent": "x" }
        });
        let correlation = recover_correlation(&raw);

        assert_eq!(correlation.len(), 2);
        assert_eq!(correlation["correlation_id"], json!("c-1"));
        assert!(recover_correlation(&json!([1, 2])).is_empty());
    }
}
