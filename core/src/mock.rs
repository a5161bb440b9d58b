//! In-memory `Transport` for unit tests.
//!
//! `MockTransport` replays queued results in order and records every request
//! it was given, so tests can assert on the method, URL and body a client
//! operation produced without opening a socket.
//!
//! ```rust
//! use jsend_core::mock::MockTransport;
//! use jsend_core::{AjaxRequest, JsendClient};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = MockTransport::new();
//! transport.respond(200, r#"{"status":"success","data":{"answer":42}}"#);
//!
//! let client = JsendClient::with_namespace(&transport, "api");
//! let answer = client.ajax(AjaxRequest::get("api/answer"), "answer").await.unwrap();
//!
//! assert_eq!(answer, Some(serde_json::json!(42)));
//! assert_eq!(transport.requests()[0].url, "api/answer");
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    pub fn respond(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }));
    }

    /// Queue a transport-level failure.
    pub fn fail(&self, error: TransportError) {
        self.push(Err(error));
    }

    pub fn push(&self, reply: Result<HttpResponse, TransportError>) {
        lock(&self.replies).push_back(reply);
    }

    /// Every request executed so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request);
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Io("no mock reply queued".to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
