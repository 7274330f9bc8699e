use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::errors::MessageError;

/// Routing and correlation metadata carried alongside a message
pub type Metadata = BTreeMap<String, Value>;

/// Metadata keys a reply must echo from its request
pub const CORRELATION_KEYS: [&str; 3] = ["correlation_id", "session_id", "parent_id"];

/// Top-level content kind of a message
///
/// Parsed case-insensitively, always serialized in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Structured,
    Binary,
    Location,
}

impl Format {
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "structured" => Ok(Format::Structured),
            "binary" => Ok(Format::Binary),
            "location" => Ok(Format::Location),
            other => Err(MessageError::shape(format!("unrecognized format '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Structured => "structured",
            Format::Binary => "binary",
            Format::Location => "location",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of a `structured/error` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Message payload, one variant per recognized `(format, subformat)` pair
///
/// | format       | subformat     | variant                |
/// |--------------|---------------|------------------------|
/// | `text`       | language tag  | [`Content::Text`]        |
/// | `structured` | `json`        | [`Content::Structured`]  |
/// | `structured` | `error`       | [`Content::Error`]       |
/// | `binary`     | media type    | [`Content::Binary`]      |
/// | `location`   | `coordinates` | [`Content::Coordinates`] |
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text { language: String, text: String },
    Structured(Map<String, Value>),
    Error(ErrorPayload),
    Binary { media_type: String, reference: String },
    Coordinates { latitude: f64, longitude: f64 },
}

fn language_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("valid regex"))
}

fn media_type() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*$")
            .expect("valid regex")
    })
}

impl Content {
    /// Natural-language text in the given language
    pub fn text(language: impl Into<String>, text: impl Into<String>) -> Self {
        Content::Text {
            language: language.into(),
            text: text.into(),
        }
    }

    pub fn english(text: impl Into<String>) -> Self {
        Content::text("english", text)
    }

    pub fn format(&self) -> Format {
        match self {
            Content::Text { .. } => Format::Text,
            Content::Structured(_) | Content::Error(_) => Format::Structured,
            Content::Binary { .. } => Format::Binary,
            Content::Coordinates { .. } => Format::Location,
        }
    }

    pub fn subformat(&self) -> &str {
        match self {
            Content::Text { language, .. } => language,
            Content::Structured(_) => "json",
            Content::Error(_) => "error",
            Content::Binary { media_type, .. } => media_type,
            Content::Coordinates { .. } => "coordinates",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            Content::Structured(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorPayload> {
        match self {
            Content::Error(payload) => Some(payload),
            _ => None,
        }
    }

    /// Checks that the payload is legal for its `(format, subformat)` pair
    pub fn validate(&self) -> Result<(), MessageError> {
        match self {
            Content::Text { language, text } => {
                if !language_tag().is_match(language) {
                    return Err(MessageError::shape(format!(
                        "unrecognized text subformat '{}'",
                        language
                    )));
                }
                if text.trim().is_empty() {
                    return Err(MessageError::shape("text content must not be empty"));
                }
                Ok(())
            }
            Content::Structured(_) => Ok(()),
            Content::Error(payload) => {
                if payload.kind.trim().is_empty() {
                    return Err(MessageError::shape("error content requires a kind"));
                }
                Ok(())
            }
            Content::Binary {
                media_type: kind,
                reference,
            } => {
                if !media_type().is_match(kind) {
                    return Err(MessageError::shape(format!(
                        "unrecognized binary subformat '{}'",
                        kind
                    )));
                }
                if reference.trim().is_empty() {
                    return Err(MessageError::shape("binary reference must not be empty"));
                }
                Ok(())
            }
            Content::Coordinates {
                latitude,
                longitude,
            } => {
                if !latitude.is_finite() || !(-90.0..=90.0).contains(latitude) {
                    return Err(MessageError::shape(format!("latitude {} out of range", latitude)));
                }
                if !longitude.is_finite() || !(-180.0..=180.0).contains(longitude) {
                    return Err(MessageError::shape(format!(
                        "longitude {} out of range",
                        longitude
                    )));
                }
                Ok(())
            }
        }
    }

    /// Decodes a wire payload given its declared format and subformat
    pub fn from_wire(format: &str, subformat: &str, content: Value) -> Result<Self, MessageError> {
        let format = Format::parse(format)?;
        let decoded = match (format, subformat.trim().to_ascii_lowercase().as_str()) {
            (Format::Text, _) => match content {
                Value::String(text) => Content::Text {
                    language: subformat.trim().to_string(),
                    text,
                },
                _ => return Err(MessageError::shape("text content must be a string")),
            },
            (Format::Structured, "json") => match content {
                Value::Object(map) => Content::Structured(map),
                _ => return Err(MessageError::shape("structured/json content must be an object")),
            },
            (Format::Structured, "error") => {
                let payload: ErrorPayload = serde_json::from_value(content)
                    .map_err(|e| MessageError::shape(format!("malformed error content: {}", e)))?;
                Content::Error(payload)
            }
            (Format::Binary, _) => match content {
                Value::String(reference) => Content::Binary {
                    media_type: subformat.trim().to_string(),
                    reference,
                },
                _ => return Err(MessageError::shape("binary content must be a string reference")),
            },
            (Format::Location, "coordinates") => {
                if let Some(extra) = content.as_object().and_then(|map| {
                    map.keys()
                        .find(|key| !matches!(key.as_str(), "latitude" | "longitude"))
                }) {
                    return Err(MessageError::shape(format!(
                        "unexpected key '{}' in location content",
                        extra
                    )));
                }
                let latitude = content.get("latitude").and_then(Value::as_f64);
                let longitude = content.get("longitude").and_then(Value::as_f64);
                match (latitude, longitude) {
                    (Some(latitude), Some(longitude)) => Content::Coordinates {
                        latitude,
                        longitude,
                    },
                    _ => {
                        return Err(MessageError::shape(
                            "location content requires numeric latitude and longitude",
                        ))
                    }
                }
            }
            (format, sub) => {
                return Err(MessageError::shape(format!(
                    "unrecognized subformat '{}' for format '{}'",
                    sub, format
                )))
            }
        };

        decoded.validate()?;
        Ok(decoded)
    }

    pub fn to_wire(&self) -> Value {
        match self {
            Content::Text { text, .. } => Value::String(text.clone()),
            Content::Structured(map) => Value::Object(map.clone()),
            Content::Error(payload) => json!(payload),
            Content::Binary { reference, .. } => Value::String(reference.clone()),
            Content::Coordinates {
                latitude,
                longitude,
            } => json!({ "latitude": latitude, "longitude": longitude }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!(Format::parse("TEXT").unwrap(), Format::Text);
        assert_eq!(Format::parse(" Structured ").unwrap(), Format::Structured);
        assert!(Format::parse("video").is_err());
    }

    #[test]
    fn text_accepts_language_tags() {
        assert!(Content::text("english", "hi").validate().is_ok());
        assert!(Content::text("en-US", "hi").validate().is_ok());
        assert!(Content::text("english!", "hi").validate().is_err());
        assert!(Content::text("english", "   ").validate().is_err());
    }

    #[test]
    fn structured_requires_known_subformat() {
        let err = Content::from_wire("structured", "yaml", json!({})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidMessageShape(_)));
    }

    #[test]
    fn structured_json_requires_object() {
        assert!(Content::from_wire("structured", "json", json!([1, 2])).is_err());
        assert!(Content::from_wire("structured", "json", json!({"a": 1})).is_ok());
    }

    #[test]
    fn error_content_requires_kind_and_message() {
        assert!(Content::from_wire("structured", "error", json!({"message": "x"})).is_err());
        assert!(Content::from_wire("structured", "error", json!({"kind": "", "message": "x"})).is_err());

        let content =
            Content::from_wire("structured", "error", json!({"kind": "timeout", "message": "slow"}))
                .unwrap();
        assert_eq!(content.as_error().unwrap().kind, "timeout");
    }

    #[test]
    fn binary_requires_media_type() {
        assert!(Content::from_wire("binary", "image/png", json!("s3://bucket/a.png")).is_ok());
        assert!(Content::from_wire("binary", "png", json!("s3://bucket/a.png")).is_err());
        assert!(Content::from_wire("binary", "image/png", json!(42)).is_err());
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(Content::from_wire(
            "location",
            "coordinates",
            json!({"latitude": 39.16, "longitude": -86.52})
        )
        .is_ok());
        assert!(Content::from_wire(
            "location",
            "coordinates",
            json!({"latitude": 91.0, "longitude": 0.0})
        )
        .is_err());
        assert!(Content::from_wire("location", "address", json!({})).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected_rather_than_dropped() {
        let err = Content::from_wire(
            "location",
            "coordinates",
            json!({"latitude": 39.16, "longitude": -86.52, "elevation": 250}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("elevation"));

        assert!(Content::from_wire(
            "structured",
            "error",
            json!({"kind": "timeout", "message": "slow", "retry_after": 5})
        )
        .is_err());
    }

    #[test]
    fn subformat_reflects_variant() {
        assert_eq!(Content::english("x").subformat(), "english");
        assert_eq!(Content::Structured(Map::new()).subformat(), "json");
        assert_eq!(Content::Structured(Map::new()).format(), Format::Structured);
    }
}
