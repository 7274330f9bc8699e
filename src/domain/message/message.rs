use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::MessageError;
use super::value_objects::{Content, ErrorPayload, Format, Metadata, CORRELATION_KEYS};

/// Raw JSON envelope as it travels over the wire
///
/// Only used at the serialization boundary; every conversion into a
/// [`Message`] goes through the same validation as direct construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub format: String,
    pub subformat: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Protocol message exchanged between agents
///
/// A self-describing, immutable envelope. There are no setters: every
/// transformation returns a new message.
///
/// # Invariants
/// - `content` is legal for its `(format, subformat)` pair
/// - A reply built with [`Message::reply`] echoes the request's correlation metadata
///
/// # Example
/// ```
/// use nlip_agents::domain::message::{Content, Message};
///
/// let request = Message::english("Weather alerts for Texas?")
///     .expect("valid message")
///     .with_metadata("correlation_id", "abc");
/// let reply = request.reply(Content::english("No alerts")).expect("valid reply");
///
/// assert_eq!(reply.correlation_id(), Some("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub struct Message {
    content: Content,
    metadata: Metadata,
}

impl Message {
    /// Creates a message, validating content against its format and subformat
    pub fn new(content: Content, metadata: Metadata) -> Result<Self, MessageError> {
        content.validate()?;
        Ok(Self { content, metadata })
    }

    pub fn text(language: &str, text: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(Content::text(language, text), Metadata::new())
    }

    pub fn english(text: impl Into<String>) -> Result<Self, MessageError> {
        Self::new(Content::english(text), Metadata::new())
    }

    pub fn structured(map: Map<String, Value>) -> Self {
        Self {
            content: Content::Structured(map),
            metadata: Metadata::new(),
        }
    }

    /// Builds a `structured/error` message
    ///
    /// An empty `kind` is replaced with `"error"` so the result is always valid.
    pub fn failure(kind: &str, message: impl Into<String>, target: Option<String>) -> Self {
        let kind = if kind.trim().is_empty() { "error" } else { kind };
        Self {
            content: Content::Error(ErrorPayload {
                kind: kind.to_string(),
                message: message.into(),
                target,
            }),
            metadata: Metadata::new(),
        }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn format(&self) -> Format {
        self.content.format()
    }

    pub fn subformat(&self) -> &str {
        self.content.subformat()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.content, Content::Error(_))
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.get("correlation_id").and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get("session_id").and_then(Value::as_str)
    }

    /// Subset of metadata that identifies the exchange this message belongs to
    pub fn correlation(&self) -> Metadata {
        correlation_of(&self.metadata)
    }

    /// Returns a copy of this message with one metadata entry added or replaced
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of this message carrying the given correlation fields
    pub fn with_correlation(mut self, correlation: &Metadata) -> Self {
        for (key, value) in correlation_of(correlation) {
            self.metadata.insert(key, value);
        }
        self
    }

    /// Builds a reply whose correlation metadata matches this message
    pub fn reply(&self, content: Content) -> Result<Message, MessageError> {
        Message::new(content, self.correlation())
    }

    /// Builds an error reply whose correlation metadata matches this message
    pub fn reply_failure(
        &self,
        kind: &str,
        message: impl Into<String>,
        target: Option<String>,
    ) -> Message {
        Message::failure(kind, message, target).with_correlation(&self.metadata)
    }

    pub fn from_json(raw: &str) -> Result<Self, MessageError> {
        serde_json::from_str(raw).map_err(|e| MessageError::shape(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&WireMessage::from(self.clone()))
            .unwrap_or_else(|_| String::from("{}"))
    }
}

/// Extracts the correlation keys from an arbitrary metadata map
pub fn correlation_of(metadata: &Metadata) -> Metadata {
    CORRELATION_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

impl TryFrom<WireMessage> for Message {
    type Error = MessageError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let content = Content::from_wire(&wire.format, &wire.subformat, wire.content)?;
        Ok(Self {
            content,
            metadata: wire.metadata.unwrap_or_default(),
        })
    }
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        WireMessage {
            format: message.content.format().to_string(),
            subformat: message.content.subformat().to_string(),
            content: message.content.to_wire(),
            metadata: if message.metadata.is_empty() {
                None
            } else {
                Some(message.metadata)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(message: &Message) -> Message {
        let raw = serde_json::to_string(message).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn text_message_round_trips_with_metadata() {
        let message = Message::english("Weather alerts for California and Texas?")
            .unwrap()
            .with_metadata("session_id", "s-1")
            .with_metadata("agent", "cli");

        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn structured_and_location_messages_round_trip() {
        let mut map = Map::new();
        map.insert("action".into(), json!("alerts"));
        map.insert("locations".into(), json!(["CA", {"nested": [1, 2.5, null]}]));
        let structured = Message::structured(map);
        assert_eq!(round_trip(&structured), structured);

        let point = Message::new(
            Content::Coordinates {
                latitude: 39.1612,
                longitude: -86.5264,
            },
            Metadata::new(),
        )
        .unwrap();
        assert_eq!(round_trip(&point), point);

        let failure = Message::failure("timeout", "no reply", Some("Texas".into()));
        assert_eq!(round_trip(&failure), failure);
    }

    #[test]
    fn wire_shape_uses_lowercase_format() {
        let message = Message::english("hello").unwrap();
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["format"], "text");
        assert_eq!(value["subformat"], "english");
        assert_eq!(value["content"], "hello");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn unrecognized_pair_is_rejected() {
        let raw = json!({"format": "video", "subformat": "mp4", "content": "x"});
        let result: Result<Message, _> = serde_json::from_value(raw);
        assert!(result.is_err());

        let err = Message::from_json(r#"{"format":"structured","subformat":"csv","content":{}}"#)
            .unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessageShape(_)));
    }

    #[test]
    fn construction_rejects_mismatched_content() {
        let err = Message::new(
            Content::Binary {
                media_type: "not-a-type".into(),
                reference: "ref".into(),
            },
            Metadata::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessageShape(_)));
    }

    #[test]
    fn reply_echoes_only_correlation_fields() {
        let request = Message::english("hi")
            .unwrap()
            .with_metadata("correlation_id", "c-1")
            .with_metadata("session_id", "s-1")
            .with_metadata("agent", "coordinator");

        let reply = request.reply(Content::english("hello")).unwrap();

        assert_eq!(reply.correlation(), request.correlation());
        assert_eq!(reply.correlation_id(), Some("c-1"));
        assert!(reply.metadata().get("agent").is_none());
    }

    #[test]
    fn with_metadata_leaves_original_untouched() {
        let original = Message::english("hi").unwrap();
        let tagged = original.clone().with_metadata("correlation_id", "x");

        assert!(original.correlation_id().is_none());
        assert_eq!(tagged.correlation_id(), Some("x"));
    }

    #[test]
    fn failure_reply_is_error_and_correlated() {
        let request = Message::english("hi")
            .unwrap()
            .with_metadata("correlation_id", "c-9");
        let reply = request.reply_failure("unparsable_request", "nothing to do", None);

        assert!(reply.is_error());
        assert_eq!(reply.correlation_id(), Some("c-9"));
        assert_eq!(reply.content().as_error().unwrap().kind, "unparsable_request");
    }
}
