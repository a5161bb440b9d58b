//! Client configuration.
//!
//! The namespace is read once when the client is built and never changes
//! afterwards.

use serde::Deserialize;

/// Environment variable consulted by `JsendConfig::from_env`.
pub const NAMESPACE_ENV: &str = "JSEND_API_NAMESPACE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JsendConfig {
    /// Prefix for every URL the client builds. May be empty, a path such as
    /// `/api/v1`, or an absolute base like `http://host/api`.
    #[serde(default, alias = "jsendApiNamespace")]
    pub api_namespace: String,
}

impl JsendConfig {
    pub fn new(api_namespace: impl Into<String>) -> Self {
        Self {
            api_namespace: api_namespace.into(),
        }
    }

    /// Read the namespace from `JSEND_API_NAMESPACE`, empty when unset.
    pub fn from_env() -> Self {
        Self::new(std::env::var(NAMESPACE_ENV).unwrap_or_default())
    }

    /// Read the namespace from a JSON environment document. Unrelated keys
    /// are ignored.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
