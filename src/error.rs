//! Error types for payload projection and event dispatch

use std::fmt;

use serde_json::Value;

use crate::constants::FIELD_PATH_SEPARATOR;
use crate::router::SubscriptionId;

/// Result alias used throughout the crate.
pub type AriResult<T> = Result<T, AriError>;

/// Error type returned by registered handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by projection and dispatch.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AriError {
    /// A required field is missing or has the wrong JSON shape.
    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayloadError),

    /// The `type` discriminant is not in the fixed event table and the
    /// router is configured to reject unknown events.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// One or more handlers failed. Every handler for the event still ran.
    #[error("{} handler(s) failed: {}", .0.len(), summarize(.0))]
    HandlerExecution(Vec<HandlerFailure>),

    /// Inbound text is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded, but its root has the wrong shape (an object for
    /// single entities and events, an array for list projections).
    #[error("payload root must be {expected}, got {actual}")]
    UnexpectedRoot {
        /// Shape the projection needs at the root.
        expected: JsonShape,
        /// Shape found at the root.
        actual: JsonShape,
    },
}

impl AriError {
    /// Returns the projection error if this is a malformed payload.
    pub fn as_malformed(&self) -> Option<&MalformedPayloadError> {
        match self {
            AriError::MalformedPayload(e) => Some(e),
            _ => None,
        }
    }

    /// Handler failures collected during dispatch, empty for other errors.
    pub fn handler_failures(&self) -> &[HandlerFailure] {
        match self {
            AriError::HandlerExecution(failures) => failures,
            _ => &[],
        }
    }
}

fn summarize(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON value shape, used to describe expected vs. actual field contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum JsonShape {
    /// JSON `null`.
    Null,
    /// `true` / `false`.
    Bool,
    /// A number that fits `i64`.
    Integer,
    /// Any other number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An array whose every element is a string.
    StringArray,
    /// An object.
    Object,
}

impl JsonShape {
    /// Shape of a concrete JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonShape::Null,
            Value::Bool(_) => JsonShape::Bool,
            Value::Number(n) if n.is_i64() => JsonShape::Integer,
            Value::Number(_) => JsonShape::Number,
            Value::String(_) => JsonShape::String,
            Value::Array(_) => JsonShape::Array,
            Value::Object(_) => JsonShape::Object,
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonShape::Null => "null",
            JsonShape::Bool => "boolean",
            JsonShape::Integer => "integer",
            JsonShape::Number => "number",
            JsonShape::String => "string",
            JsonShape::Array => "array",
            JsonShape::StringArray => "array of strings",
            JsonShape::Object => "object",
        };
        f.write_str(name)
    }
}

/// What went wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    /// The field is required but absent (or `null`).
    Missing,
    /// The field is present with an unexpected shape.
    WrongShape {
        /// Shape the entity declares.
        expected: JsonShape,
        /// Shape found in the payload.
        actual: JsonShape,
    },
}

/// Projection failure for one field of one payload.
///
/// `field` is a dotted path from the payload root, e.g. `channel.caller.name`
/// or `[2].id` for list projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPayloadError {
    field: String,
    kind: MalformedKind,
    /// Path starts with a list index segment (`[3]...`).
    leading_index: bool,
}

impl MalformedPayloadError {
    /// Required field absent.
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: MalformedKind::Missing,
            leading_index: false,
        }
    }

    /// Field present with the wrong shape.
    pub fn wrong_shape(field: impl Into<String>, expected: JsonShape, actual: JsonShape) -> Self {
        Self {
            field: field.into(),
            kind: MalformedKind::WrongShape { expected, actual },
            leading_index: false,
        }
    }

    /// Prefix the field path with the enclosing field name.
    pub(crate) fn within(mut self, parent: &str) -> Self {
        self.field = if self.leading_index {
            format!("{}{}", parent, self.field)
        } else {
            format!("{}{}{}", parent, FIELD_PATH_SEPARATOR, self.field)
        };
        self.leading_index = false;
        self
    }

    /// Prefix the field path with the index of the enclosing list element.
    pub(crate) fn within_index(mut self, index: usize) -> Self {
        self.field = if self.leading_index {
            format!("[{}]{}", index, self.field)
        } else {
            format!("[{}]{}{}", index, FIELD_PATH_SEPARATOR, self.field)
        };
        self.leading_index = true;
        self
    }

    /// Dotted path of the offending field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether the field was missing or mis-shaped.
    pub fn kind(&self) -> &MalformedKind {
        &self.kind
    }
}

impl fmt::Display for MalformedPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MalformedKind::Missing => {
                write!(f, "malformed payload: missing required field `{}`", self.field)
            }
            MalformedKind::WrongShape { expected, actual } => write!(
                f,
                "malformed payload: field `{}` expected {}, got {}",
                self.field, expected, actual
            ),
        }
    }
}

impl std::error::Error for MalformedPayloadError {}

/// One handler's failure during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Registration that failed.
    pub subscription: SubscriptionId,
    /// Wire discriminant of the event being dispatched.
    pub event_type: String,
    /// Error text, or the panic message.
    pub message: String,
    /// Whether the handler panicked rather than returning `Err`.
    pub panicked: bool,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = if self.panicked { "panicked" } else { "failed" };
        write!(
            f,
            "handler {} {} on {}: {}",
            self.subscription, how, self.event_type, self.message
        )
    }
}
