//! Client for HTTP APIs that answer in the JSend envelope format.
//!
//! # Overview
//! Every JSend response body is `{"status": ..., "data": ..., "message": ...}`
//! where `status` is `success`, `fail` or `error`. `JsendClient` issues a
//! request through a pluggable `Transport`, reads the envelope, pulls a named
//! node out of `data` and maps it onto your model types.
//!
//! # Design
//! - `envelope` is pure: it turns a response into extracted data or a
//!   classified `JsendError`.
//! - `JsendClient` holds only a transport and an immutable namespace. It
//!   performs one request per call and never retries.
//! - Model types opt in through the `Resource` trait.
//! - Callers match on `JsendError` to tell a `fail` (`Validation`) from an
//!   `error` (`Server`) from a server that did not speak JSend at all
//!   (`Transport`).

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mock;
pub mod resource;
pub mod transport;

pub use client::{url_for, AjaxRequest, JsendClient};
pub use config::JsendConfig;
pub use envelope::{interpret, interpret_failure, interpret_response, resolve_node, Envelope, Status, ROOT};
pub use error::{JsendError, ServerError, TransportError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resource::{map_model, map_models, Resource};
pub use transport::{Transport, UreqTransport};
