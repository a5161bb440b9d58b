//! JSend envelope parsing and interpretation.
//!
//! # Design
//! Everything here is pure: a body or a response goes in, extracted data or
//! a classified `JsendError` comes out. The status field alone decides how
//! the rest of the envelope is read, and anything that is not `success` or
//! `fail` is read as `error`.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{JsendError, ServerError, TransportError, ValidationError};
use crate::http::HttpResponse;

/// Data node path that selects the whole `data` value.
pub const ROOT: &str = ".";

/// The three states a JSend response can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Fail,
    Error,
}

impl Status {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("success") => Status::Success,
            Some("fail") => Status::Fail,
            _ => Status::Error,
        }
    }
}

/// A parsed JSend response body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: Status,
    pub data: Value,
    pub message: Option<String>,
}

impl Envelope {
    /// Parse a response body. Fails only when the body is not JSON.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(body).map(Self::from_value)
    }

    /// Read an envelope out of an arbitrary JSON value.
    ///
    /// A value that is not an object is an `error` envelope with no message.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self {
                status: Status::Error,
                data: Value::Null,
                message: None,
            };
        };
        let status = Status::from_value(map.get("status"));
        let data = map.remove("data").unwrap_or(Value::Null);
        let message = match map.remove("message") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        Self {
            status,
            data,
            message,
        }
    }
}

/// Resolve a dot-separated path against `data`.
///
/// `"."` and `""` select `data` itself. Objects are indexed by key and
/// arrays by decimal position; any segment that does not match yields
/// `None`.
pub fn resolve_node<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() || path == ROOT {
        return Some(data);
    }
    path.split('.').try_fold(data, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Turn an envelope into the value at `path`, or a classified error.
///
/// A `success` envelope whose path does not resolve gives `Ok(None)`.
pub fn interpret(envelope: Envelope, path: &str) -> Result<Option<Value>, JsendError> {
    match envelope.status {
        Status::Success => {
            let node = resolve_node(&envelope.data, path).cloned();
            debug!(path, found = node.is_some(), "jsend success");
            Ok(node)
        }
        Status::Fail => {
            let err = ValidationError::from_data(envelope.data);
            warn!(fields = err.errors().len(), reason = %err, "jsend fail");
            Err(err.into())
        }
        Status::Error => {
            warn!(reason = ?envelope.message, "jsend error");
            Err(ServerError::new(envelope.message).into())
        }
    }
}

/// Interpret a failed transport call.
///
/// When the failure carries a JSON body it is read as an envelope and
/// interpreted like any other. Otherwise the failure is returned as-is.
pub fn interpret_failure(failure: TransportError, path: &str) -> Result<Option<Value>, JsendError> {
    let parsed = failure.body().map(Envelope::parse);
    match parsed {
        Some(Ok(envelope)) => interpret(envelope, path),
        _ => {
            warn!(error = %failure, "response is not a jsend envelope");
            Err(failure.into())
        }
    }
}

/// Interpret whatever response the transport produced.
///
/// Only a 2xx response with a JSON body is read on the success path. Every
/// other response goes through `interpret_failure`.
pub fn interpret_response(response: HttpResponse, path: &str) -> Result<Option<Value>, JsendError> {
    if response.is_success() {
        if let Ok(envelope) = Envelope::parse(&response.body) {
            return interpret(envelope, path);
        }
    }
    interpret_failure(
        TransportError::Status {
            status: response.status,
            body: response.body,
        },
        path,
    )
}
