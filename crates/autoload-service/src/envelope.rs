//! Push envelope decoding.
//!
//! A push request body looks like
//! `{"message": {"data": "<base64>", "attributes": {...}}, "subscription": "..."}`.

use std::collections::HashMap;

use autoload_core::error::EnvelopeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

/// Normalized notification: the decoded payload object plus the message attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationEnvelope {
    /// Decoded `message.data`. Non-object content is wrapped as `{"raw": <text>}`.
    pub payload: Map<String, Value>,
    /// `message.attributes`, string values only.
    pub attributes: HashMap<String, String>,
}

impl NotificationEnvelope {
    /// Comma-separated payload keys, sorted, for diagnostics.
    #[must_use]
    pub fn payload_keys(&self) -> String {
        let mut keys: Vec<&str> = self.payload.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys.join(", ")
    }

    /// Comma-separated attribute keys, sorted, for diagnostics.
    #[must_use]
    pub fn attribute_keys(&self) -> String {
        let mut keys: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys.join(", ")
    }
}

/// Decode a push request body.
///
/// # Errors
///
/// - [`EnvelopeError::MissingMessage`] if there is no `message` field (or it is null).
/// - [`EnvelopeError::MalformedMessage`] if `message` is not an object.
/// - [`EnvelopeError::InvalidData`] if `message.data` is not a base64 string.
pub fn decode_push(body: &Value) -> Result<NotificationEnvelope, EnvelopeError> {
    let message = match body.get("message") {
        None | Some(Value::Null) => return Err(EnvelopeError::MissingMessage),
        Some(Value::Object(message)) => message,
        Some(other) => {
            return Err(EnvelopeError::MalformedMessage {
                reason: format!("expected an object, found {}", json_kind(other)),
            });
        },
    };

    let attributes = message
        .get("attributes")
        .and_then(Value::as_object)
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(k, v)| attribute_value(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    let payload = match message.get("data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::String(data)) => decode_data(data)?,
        Some(other) => {
            return Err(EnvelopeError::InvalidData {
                reason: format!("expected a base64 string, found {}", json_kind(other)),
            });
        },
    };

    Ok(NotificationEnvelope {
        payload,
        attributes,
    })
}

fn decode_data(data: &str) -> Result<Map<String, Value>, EnvelopeError> {
    if data.is_empty() {
        return Ok(Map::new());
    }
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| EnvelopeError::InvalidData {
            reason: e.to_string(),
        })?;
    let text = String::from_utf8_lossy(&bytes);

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(payload)) => Ok(payload),
        _ => {
            let mut payload = Map::new();
            payload.insert("raw".to_string(), Value::String(text.into_owned()));
            Ok(payload)
        },
    }
}

fn attribute_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn encode(text: &str) -> String {
        STANDARD.encode(text)
    }

    #[test]
    fn test_decodes_json_payload_and_attributes() {
        let body = json!({
            "message": {
                "data": encode(r#"{"bucket": "b", "name": "incoming/x.csv"}"#),
                "attributes": {"eventType": "OBJECT_FINALIZE", "notificationConfig": "c"},
                "messageId": "1"
            },
            "subscription": "projects/p/subscriptions/s"
        });

        let envelope = decode_push(&body).unwrap();

        assert_eq!(envelope.payload["bucket"], "b");
        assert_eq!(envelope.payload["name"], "incoming/x.csv");
        assert_eq!(envelope.attributes["eventType"], "OBJECT_FINALIZE");
        assert_eq!(envelope.payload_keys(), "bucket, name");
        assert_eq!(envelope.attribute_keys(), "eventType, notificationConfig");
    }

    #[test]
    fn test_non_json_data_is_wrapped() {
        let body = json!({"message": {"data": encode("hello")}});
        let envelope = decode_push(&body).unwrap();
        assert_eq!(envelope.payload["raw"], "hello");

        let body = json!({"message": {"data": encode("[1, 2]")}});
        let envelope = decode_push(&body).unwrap();
        assert_eq!(envelope.payload["raw"], "[1, 2]");
    }

    #[test]
    fn test_missing_data_gives_empty_payload() {
        let body = json!({"message": {"attributes": {"bucketId": "b", "objectId": "x.csv"}}});
        let envelope = decode_push(&body).unwrap();
        assert!(envelope.payload.is_empty());
        assert_eq!(envelope.attributes.len(), 2);

        let body = json!({"message": {"data": ""}});
        assert!(decode_push(&body).unwrap().payload.is_empty());
    }

    #[test]
    fn test_non_string_attributes() {
        let body = json!({"message": {"attributes": {"generation": 17, "nested": {"a": 1}}}});
        let envelope = decode_push(&body).unwrap();
        assert_eq!(envelope.attributes["generation"], "17");
        assert!(!envelope.attributes.contains_key("nested"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode_push(&json!({})),
            Err(EnvelopeError::MissingMessage)
        ));
        assert!(matches!(
            decode_push(&json!({"message": null})),
            Err(EnvelopeError::MissingMessage)
        ));
        assert!(matches!(
            decode_push(&json!({"message": "text"})),
            Err(EnvelopeError::MalformedMessage { .. })
        ));
        assert!(matches!(
            decode_push(&json!({"message": {"data": "***"}})),
            Err(EnvelopeError::InvalidData { .. })
        ));
        assert!(matches!(
            decode_push(&json!({"message": {"data": 5}})),
            Err(EnvelopeError::InvalidData { .. })
        ));
    }
}
