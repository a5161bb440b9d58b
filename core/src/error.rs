//! Error types for the JSend client.
//!
//! # Design
//! A `fail` envelope becomes `Validation`, an `error` envelope (or any
//! status the client does not recognize) becomes `Server`. When the server
//! never produced a JSend body at all, the transport's own failure is handed
//! back untouched in `Transport` so its status and body stay available for
//! debugging. The two serde variants cover model mapping on either side of
//! the wire.

use serde_json::{Map, Value};

/// Errors returned by `JsendClient` operations and the envelope interpreter.
#[derive(Debug, thiserror::Error)]
pub enum JsendError {
    /// The server answered with status `fail`.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server answered with status `error`, or a status we do not know.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The transport failed and its body was not a JSend envelope.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A model could not be serialized into a request body.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The extracted data node could not be mapped onto a model.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}

/// Field-level problems reported by a `fail` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    errors: Map<String, Value>,
}

impl ValidationError {
    /// Build from a `fail` envelope's `data`. Anything other than an object
    /// yields an empty mapping.
    pub fn from_data(data: Value) -> Self {
        let errors = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { errors }
    }

    /// Field name to message, in the order the server sent them.
    pub fn errors(&self) -> &Map<String, Value> {
        &self.errors
    }

    /// Message for a single field, if the server reported one.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.errors.get(name)
    }

    /// All field messages joined with `", "`.
    pub fn message(&self) -> String {
        self.errors
            .values()
            .map(render_message)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}

fn render_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A non-recoverable condition reported by an `error` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub message: Option<String>,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or("server error"))
    }
}

impl std::error::Error for ServerError {}

impl ServerError {
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }
}

/// A failure raised by the transport itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// A response arrived but did not carry a usable JSend body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No response arrived at all.
    #[error("transport failed: {0}")]
    Io(String),
}

impl TransportError {
    /// Raw response body, when the failure carried one.
    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            TransportError::Io(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Io(_) => None,
        }
    }
}
