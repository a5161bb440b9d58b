//! The contract a model type implements to be fetched and saved through
//! `JsendClient`.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::ROOT;
use crate::error::JsendError;

/// A model type backed by a JSend endpoint.
///
/// `FETCH_NODE` and `FETCH_ALL_NODE` name the data node holding a single
/// record and the list of records respectively; both default to the whole
/// `data` value.
///
/// # Example
///
/// ```rust
/// use jsend_core::Resource;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Thing {
///     #[serde(skip_serializing_if = "Option::is_none")]
///     id: Option<u64>,
///     name: String,
/// }
///
/// impl Resource for Thing {
///     const ENDPOINT: &'static str = "things";
///     const FETCH_NODE: &'static str = "thing";
///     const FETCH_ALL_NODE: &'static str = "things";
///     type Id = u64;
///
///     fn id(&self) -> Option<&u64> {
///         self.id.as_ref()
///     }
/// }
/// ```
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    const ENDPOINT: &'static str;
    const FETCH_NODE: &'static str = ROOT;
    const FETCH_ALL_NODE: &'static str = ROOT;

    type Id: Display + Send + Sync;

    /// The record's id, absent for records not yet saved.
    fn id(&self) -> Option<&Self::Id>;

    /// Build an instance from the attributes the server returned.
    fn from_attributes(attributes: Value) -> Result<Self, JsendError> {
        serde_json::from_value(attributes).map_err(|e| JsendError::DeserializationError(e.to_string()))
    }

    /// The representation sent as a request body.
    fn to_json(&self) -> Result<Value, JsendError> {
        serde_json::to_value(self).map_err(|e| JsendError::SerializationError(e.to_string()))
    }
}

/// Map a single extracted node onto `M`. An absent node maps from `null`.
pub fn map_model<M: Resource>(data: Option<Value>) -> Result<M, JsendError> {
    M::from_attributes(data.unwrap_or(Value::Null))
}

/// Map an extracted array onto a `Vec<M>`, keeping the server's order.
pub fn map_models<M: Resource>(data: Option<Value>) -> Result<Vec<M>, JsendError> {
    match data {
        Some(Value::Array(items)) => items.into_iter().map(M::from_attributes).collect(),
        Some(other) => Err(JsendError::DeserializationError(format!(
            "expected an array of {} records, got {}",
            M::ENDPOINT,
            kind(&other)
        ))),
        None => Err(JsendError::DeserializationError(format!(
            "no {} records in response",
            M::ENDPOINT
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
