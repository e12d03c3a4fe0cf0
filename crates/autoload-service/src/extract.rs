//! Target extraction and filtering.
//!
//! Storage notifications arrive in several shapes. Each shape is handled by a pure
//! strategy function; [`extract_locator`] tries them in priority order.

use std::collections::HashMap;
use std::fmt;

use autoload_core::error::ExtractionError;
use autoload_core::types::ObjectLocator;
use serde_json::{Map, Value};

use crate::config::ServiceConfig;
use crate::envelope::NotificationEnvelope;

/// Recognized extension of delimited text objects, compared case-insensitively.
pub const DELIMITED_EXTENSION: &str = ".csv";

const ATTRIBUTE_CONTAINER_KEYS: &[&str] = &["bucketId", "bucket", "bucket_name"];
const ATTRIBUTE_OBJECT_KEYS: &[&str] = &["objectId", "name", "object", "object_name"];
const PAYLOAD_CONTAINER_KEYS: &[&str] = &["bucket", "bucketId", "bucket_name"];
const PAYLOAD_OBJECT_KEYS: &[&str] = &["name", "objectId", "object", "object_name"];

/// A single extraction strategy.
pub type ExtractionStrategy = fn(&Map<String, Value>, &HashMap<String, String>) -> Option<ObjectLocator>;

/// Strategies in the order they are tried.
pub const STRATEGIES: [(&str, ExtractionStrategy); 3] = [
    ("attributes", from_attributes),
    ("payload", from_payload),
    ("nested data", from_nested_data),
];

/// Locator from message attributes (storage notification convention).
#[must_use]
pub fn from_attributes(
    _payload: &Map<String, Value>,
    attributes: &HashMap<String, String>,
) -> Option<ObjectLocator> {
    let lookup = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| attributes.get(*k).filter(|v| !v.is_empty()).cloned())
    };
    Some(ObjectLocator::new(
        lookup(ATTRIBUTE_CONTAINER_KEYS)?,
        lookup(ATTRIBUTE_OBJECT_KEYS)?,
    ))
}

/// Locator from top-level keys of the decoded payload (object resource body).
#[must_use]
pub fn from_payload(
    payload: &Map<String, Value>,
    _attributes: &HashMap<String, String>,
) -> Option<ObjectLocator> {
    locator_in_object(payload)
}

/// Locator from a nested `data` object (event-delivery envelope convention).
#[must_use]
pub fn from_nested_data(
    payload: &Map<String, Value>,
    _attributes: &HashMap<String, String>,
) -> Option<ObjectLocator> {
    payload
        .get("data")
        .and_then(Value::as_object)
        .and_then(locator_in_object)
}

fn locator_in_object(object: &Map<String, Value>) -> Option<ObjectLocator> {
    let lookup = |keys: &[&str]| {
        keys.iter().find_map(|k| {
            object
                .get(*k)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    };
    Some(ObjectLocator::new(
        lookup(PAYLOAD_CONTAINER_KEYS)?,
        lookup(PAYLOAD_OBJECT_KEYS)?,
    ))
}

/// Recover the object locator from a notification.
///
/// # Errors
///
/// Returns [`ExtractionError`] if no strategy matches.
pub fn extract_locator(envelope: &NotificationEnvelope) -> Result<ObjectLocator, ExtractionError> {
    for (name, strategy) in STRATEGIES {
        if let Some(locator) = strategy(&envelope.payload, &envelope.attributes) {
            tracing::debug!(strategy = name, %locator, "Extracted object locator");
            return Ok(locator);
        }
    }
    Err(ExtractionError {
        payload_keys: envelope.payload_keys(),
        attribute_keys: envelope.attribute_keys(),
    })
}

/// Why an object was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The object lives in a container other than the configured one.
    ContainerMismatch {
        /// The configured container
        expected: String,
    },
    /// The object path is outside the configured prefix.
    OutsidePrefix {
        /// The configured prefix
        prefix: String,
    },
    /// The object is not a delimited text file.
    NotDelimited,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerMismatch { expected } => {
                write!(f, "container does not match '{expected}'")
            },
            Self::OutsidePrefix { prefix } => write!(f, "path is outside prefix '{prefix}'"),
            Self::NotDelimited => write!(f, "not a {DELIMITED_EXTENSION} object"),
        }
    }
}

/// Outcome of the filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Process the object.
    Accept,
    /// Acknowledge without processing.
    Skip(SkipReason),
}

/// Apply the container, prefix and extension filters in that order.
#[must_use]
pub fn evaluate(locator: &ObjectLocator, config: &ServiceConfig) -> Decision {
    if let Some(expected) = &config.container {
        if locator.container != *expected {
            return Decision::Skip(SkipReason::ContainerMismatch {
                expected: expected.clone(),
            });
        }
    }
    if !config.path_prefix.is_empty() && !locator.path.starts_with(&config.path_prefix) {
        return Decision::Skip(SkipReason::OutsidePrefix {
            prefix: config.path_prefix.clone(),
        });
    }
    if !locator.path.to_lowercase().ends_with(DELIMITED_EXTENSION) {
        return Decision::Skip(SkipReason::NotDelimited);
    }
    Decision::Accept
}
