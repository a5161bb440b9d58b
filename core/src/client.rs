//! Resource client for JSend APIs.
//!
//! # Design
//! `JsendClient` holds a transport and the namespace resolved at
//! construction, and nothing else. Every operation is split the same way:
//! a `*_request` builder produces an `AjaxRequest`, `ajax` performs exactly
//! one transport call and interprets the envelope, and the model helpers in
//! `resource` map the extracted node. The builders are public so a caller
//! that owns the I/O can drive the round-trip itself and finish with
//! `envelope::interpret_response`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::JsendConfig;
use crate::envelope::{interpret_failure, interpret_response, ROOT};
use crate::error::JsendError;
use crate::http::{HttpMethod, HttpRequest};
use crate::resource::{map_model, map_models, Resource};
use crate::transport::Transport;

/// Bytes escaped when an id is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Join URL segments with `/`, skipping absent and empty ones.
pub fn url_for<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let kept: Vec<S> = parts
        .into_iter()
        .flatten()
        .filter(|part| !part.as_ref().is_empty())
        .collect();
    kept.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join("/")
}

/// A request as callers describe it: where, how, and with what data.
///
/// For GET and DELETE an object in `data` is sent as a query string, and a
/// string is appended verbatim. For the other methods `data` becomes a JSON
/// body, not the form-encoded body a browser `$.ajax` call would send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AjaxRequest {
    pub url: String,
    pub method: HttpMethod,
    pub data: Option<Value>,
}

impl AjaxRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            data: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn into_http(self) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        let mut url = self.url;
        let mut body = None;

        match self.data {
            Some(data) if self.method.sends_query() => {
                let query = encode_query(&data);
                if !query.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&query);
                }
            }
            Some(data) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                body = Some(data.to_string());
            }
            None => {}
        }

        HttpRequest {
            method: self.method,
            url,
            headers,
            body,
        }
    }
}

fn encode_query(data: &Value) -> String {
    match data {
        Value::Object(map) => {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in map {
                match value {
                    Value::String(s) => query.append_pair(key, s),
                    Value::Null => query.append_pair(key, ""),
                    other => query.append_pair(key, &other.to_string()),
                };
            }
            query.finish()
        }
        Value::String(raw) => raw.clone(),
        _ => String::new(),
    }
}

/// Client for a JSend API.
///
/// Cheap to clone when the transport is, and safe to share between tasks:
/// no operation mutates the client.
#[derive(Debug, Clone)]
pub struct JsendClient<T> {
    transport: T,
    namespace: String,
}

impl<T> JsendClient<T> {
    pub fn new(transport: T, config: &JsendConfig) -> Self {
        Self::with_namespace(transport, &config.api_namespace)
    }

    pub fn with_namespace(transport: T, namespace: &str) -> Self {
        Self {
            transport,
            namespace: namespace.trim_end_matches('/').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// URL of `M`'s collection, or of one record when `id` is given.
    ///
    /// The namespace and endpoint are used literally; the id is
    /// percent-encoded as a single path segment.
    pub fn resource_url<M: Resource>(&self, id: Option<&M::Id>) -> String {
        let id = id.map(|id| utf8_percent_encode(&id.to_string(), PATH_SEGMENT).to_string());
        url_for([Some(self.namespace.as_str()), Some(M::ENDPOINT), id.as_deref()])
    }

    pub fn fetch_all_request<M: Resource>(&self) -> AjaxRequest {
        AjaxRequest::get(self.resource_url::<M>(None))
    }

    pub fn fetch_request<M: Resource>(&self, id: &M::Id) -> AjaxRequest {
        AjaxRequest::get(self.resource_url::<M>(Some(id)))
    }

    pub fn create_request<M: Resource>(&self, model: &M) -> Result<AjaxRequest, JsendError> {
        Ok(AjaxRequest::new(HttpMethod::Post, self.resource_url::<M>(None)).with_data(model.to_json()?))
    }

    pub fn update_request<M: Resource>(&self, model: &M) -> Result<AjaxRequest, JsendError> {
        Ok(AjaxRequest::new(HttpMethod::Patch, self.resource_url::<M>(model.id())).with_data(model.to_json()?))
    }

    pub fn delete_request<M: Resource>(&self, model: &M) -> AjaxRequest {
        AjaxRequest::new(HttpMethod::Delete, self.resource_url::<M>(model.id()))
    }
}

impl<T: Transport> JsendClient<T> {
    /// Perform one request and extract the data node at `path`.
    ///
    /// Resolves to `None` when the envelope is `success` but `path` names
    /// nothing. `fail` and `error` envelopes become `Validation` and `Server`
    /// errors; a failure without a JSend body comes back as `Transport`.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn ajax(&self, request: AjaxRequest, path: &str) -> Result<Option<Value>, JsendError> {
        let request = request.into_http();
        debug!("sending request");
        match self.transport.execute(request).await {
            Ok(response) => {
                debug!(status = response.status, "response received");
                interpret_response(response, path)
            }
            Err(failure) => interpret_failure(failure, path),
        }
    }

    #[instrument(skip(self), fields(endpoint = M::ENDPOINT))]
    pub async fn fetch_all<M: Resource>(&self) -> Result<Vec<M>, JsendError> {
        let data = self.ajax(self.fetch_all_request::<M>(), M::FETCH_ALL_NODE).await?;
        let models = map_models(data)?;
        debug!(count = models.len(), "fetched all");
        Ok(models)
    }

    #[instrument(skip(self, id), fields(endpoint = M::ENDPOINT, id = %id))]
    pub async fn fetch<M: Resource>(&self, id: &M::Id) -> Result<M, JsendError> {
        let data = self.ajax(self.fetch_request::<M>(id), M::FETCH_NODE).await?;
        map_model(data)
    }

    /// POST the model. The extracted node is returned as-is; merging it back
    /// into the model is up to the caller.
    #[instrument(skip(self, model), fields(endpoint = M::ENDPOINT))]
    pub async fn create<M: Resource>(&self, model: &M) -> Result<Option<Value>, JsendError> {
        self.ajax(self.create_request(model)?, M::FETCH_NODE).await
    }

    #[instrument(skip(self, model), fields(endpoint = M::ENDPOINT))]
    pub async fn update<M: Resource>(&self, model: &M) -> Result<Option<Value>, JsendError> {
        self.ajax(self.update_request(model)?, M::FETCH_NODE).await
    }

    #[instrument(skip(self, model), fields(endpoint = M::ENDPOINT))]
    pub async fn delete<M: Resource>(&self, model: &M) -> Result<Option<Value>, JsendError> {
        self.ajax(self.delete_request(model), ROOT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::MockTransport;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u32>,
        #[serde(default)]
        foo: String,
    }

    impl Resource for Widget {
        const ENDPOINT: &'static str = "test-endpoint";
        const FETCH_NODE: &'static str = "test-fetch";
        const FETCH_ALL_NODE: &'static str = "test-fetchAll";
        type Id = u32;

        fn id(&self) -> Option<&u32> {
            self.id.as_ref()
        }
    }

    fn widget(id: Option<u32>) -> Widget {
        Widget {
            id,
            foo: "bar".to_string(),
        }
    }

    fn client(transport: &MockTransport) -> JsendClient<&MockTransport> {
        JsendClient::with_namespace(transport, "test-namespace")
    }

    #[test]
    fn url_for_skips_absent_and_empty_segments() {
        assert_eq!(url_for([Some("ns"), Some("things"), None]), "ns/things");
        assert_eq!(url_for([Some(""), Some("things"), Some("1")]), "things/1");
        assert_eq!(url_for([Some("ns"), Some("things"), Some("0")]), "ns/things/0");
        assert_eq!(url_for::<_, &str>([None, None]), "");
    }

    #[test]
    fn namespace_trailing_slash_is_trimmed() {
        let transport = MockTransport::new();
        let client = JsendClient::with_namespace(&transport, "http://localhost:3000/api/");
        assert_eq!(client.namespace(), "http://localhost:3000/api");
        assert_eq!(
            client.resource_url::<Widget>(Some(&7)),
            "http://localhost:3000/api/test-endpoint/7"
        );
    }

    #[test]
    fn empty_namespace_from_default_config() {
        let transport = MockTransport::new();
        let client = JsendClient::new(&transport, &JsendConfig::default());
        assert_eq!(client.resource_url::<Widget>(None), "test-endpoint");
    }

    #[test]
    fn get_data_becomes_query_string() {
        let req = AjaxRequest::get("things")
            .with_data(json!({"q": "a b", "page": 2, "done": null}))
            .into_http();
        assert_eq!(req.url, "things?q=a+b&page=2&done=");
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn query_appends_to_existing_query() {
        let req = AjaxRequest::get("things?sort=name")
            .with_data(json!({"page": 1}))
            .into_http();
        assert_eq!(req.url, "things?sort=name&page=1");
    }

    #[test]
    fn post_data_becomes_json_body() {
        let req = AjaxRequest::new(HttpMethod::Post, "things")
            .with_data(json!({"name": "x"}))
            .into_http();
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"x"}"#));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn ajax_passes_request_to_transport() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":null}"#);

        let result = client(&transport).ajax(AjaxRequest::get("foo"), ROOT).await.unwrap();

        assert_eq!(result, Some(Value::Null));
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "foo");
    }

    #[tokio::test]
    async fn ajax_resolves_to_data_node() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":{"foo":{"bar":"bar"}}}"#);

        let result = client(&transport).ajax(AjaxRequest::get("foo"), "foo").await.unwrap();

        assert_eq!(result, Some(json!({"bar": "bar"})));
    }

    #[tokio::test]
    async fn ajax_fail_rejects_with_validation_error() {
        let transport = MockTransport::new();
        transport.respond(400, r#"{"status":"fail","data":{"foo":"bar"}}"#);

        let request = AjaxRequest::new(HttpMethod::Post, "foo");
        let err = client(&transport).ajax(request, "foo").await.unwrap_err();

        match err {
            JsendError::Validation(err) => assert_eq!(err.field("foo"), Some(&json!("bar"))),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ajax_error_rejects_with_server_error() {
        let transport = MockTransport::new();
        transport.respond(500, r#"{"status":"error","message":"foobar"}"#);

        let err = client(&transport)
            .ajax(AjaxRequest::new(HttpMethod::Post, "foo"), "foo")
            .await
            .unwrap_err();

        assert!(matches!(err, JsendError::Server(_)));
        assert_eq!(err.to_string(), "foobar");
    }

    #[tokio::test]
    async fn ajax_io_failure_propagates_unchanged() {
        let transport = MockTransport::new();
        transport.fail(TransportError::Io("connection refused".to_string()));

        let err = client(&transport).ajax(AjaxRequest::get("foo"), ROOT).await.unwrap_err();

        assert!(matches!(err, JsendError::Transport(TransportError::Io(ref m)) if m == "connection refused"));
    }

    #[tokio::test]
    async fn fetch_all_maps_every_record() {
        let transport = MockTransport::new();
        transport.respond(
            200,
            r#"{"status":"success","data":{"test-fetchAll":[{"id":1,"foo":"bar"},{"id":2}]}}"#,
        );

        let widgets: Vec<Widget> = client(&transport).fetch_all().await.unwrap();

        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0], widget(Some(1)));
        assert_eq!(widgets[1].id, Some(2));
        let sent = transport.requests();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "test-namespace/test-endpoint");
    }

    #[tokio::test]
    async fn fetch_all_with_missing_node_is_deserialization_error() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":{}}"#);

        let err = client(&transport).fetch_all::<Widget>().await.unwrap_err();

        assert!(matches!(err, JsendError::DeserializationError(_)));
    }

    #[tokio::test]
    async fn fetch_maps_single_record() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":{"test-fetch":{"id":1,"foo":"bar"}}}"#);

        let found: Widget = client(&transport).fetch(&1).await.unwrap();

        assert_eq!(found, widget(Some(1)));
        assert_eq!(transport.requests()[0].url, "test-namespace/test-endpoint/1");
    }

    #[tokio::test]
    async fn create_sends_post_with_serialized_model() {
        let transport = MockTransport::new();
        transport.respond(201, r#"{"status":"success","data":{"test-fetch":{"id":1,"foo":"bar"}}}"#);

        let created = client(&transport).create(&widget(None)).await.unwrap();

        assert_eq!(created, Some(json!({"id": 1, "foo": "bar"})));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "test-namespace/test-endpoint");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"foo": "bar"}));
    }

    #[tokio::test]
    async fn update_sends_patch_to_record_url() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":{"test-fetch":{"id":1,"foo":"bar"}}}"#);

        client(&transport).update(&widget(Some(1))).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Patch);
        assert_eq!(sent.url, "test-namespace/test-endpoint/1");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"id": 1, "foo": "bar"}));
    }

    #[tokio::test]
    async fn delete_sends_delete_without_body() {
        let transport = MockTransport::new();
        transport.respond(200, r#"{"status":"success","data":null}"#);

        let result = client(&transport).delete(&widget(Some(1))).await.unwrap();

        assert_eq!(result, Some(Value::Null));
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.url, "test-namespace/test-endpoint/1");
        assert!(sent.body.is_none());
    }

    #[tokio::test]
    async fn failures_are_not_retried() {
        let transport = MockTransport::new();
        transport.respond(500, r#"{"status":"error","message":"down"}"#);
        transport.respond(200, r#"{"status":"success","data":{"test-fetch":{"id":1}}}"#);

        let err = client(&transport).fetch::<Widget>(&1).await.unwrap_err();

        assert!(matches!(err, JsendError::Server(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Tag {
        slug: String,
    }

    impl Resource for Tag {
        const ENDPOINT: &'static str = "tags";
        type Id = String;

        fn id(&self) -> Option<&String> {
            Some(&self.slug)
        }
    }

    #[test]
    fn ids_are_escaped_as_one_path_segment() {
        let transport = MockTransport::new();
        let client = JsendClient::with_namespace(&transport, "http://localhost:3000/api");

        let req = client.fetch_request::<Tag>(&"a b".to_string());
        assert_eq!(req.url, "http://localhost:3000/api/tags/a%20b");

        let req = client.fetch_request::<Tag>(&"a?b".to_string());
        assert_eq!(req.url, "http://localhost:3000/api/tags/a%3Fb");

        let req = client.delete_request(&Tag { slug: "x/y".to_string() });
        assert_eq!(req.url, "http://localhost:3000/api/tags/x%2Fy");

        let req = client.fetch_request::<Tag>(&"100%".to_string());
        assert_eq!(req.url, "http://localhost:3000/api/tags/100%25");
    }

    #[test]
    fn plain_ids_are_left_alone() {
        let transport = MockTransport::new();
        let client = JsendClient::with_namespace(&transport, "api");
        let req = client.fetch_request::<Tag>(&"rust-2021_v1.0~x".to_string());
        assert_eq!(req.url, "api/tags/rust-2021_v1.0~x");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn client_is_send_and_sync() {
        assert_send_sync::<JsendClient<crate::transport::UreqTransport>>();
        assert_send_sync::<JsendClient<std::sync::Arc<MockTransport>>>();
        assert_send_sync::<JsendClient<Box<dyn Transport>>>();
    }

    #[tokio::test]
    async fn boxed_transport_drives_client() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"status":"success","data":{"test-fetch":{"id":4,"foo":"bar"}}}"#);
        let transport: Box<dyn Transport> = Box::new(mock);
        let client = JsendClient::with_namespace(transport, "test-namespace");

        let found: Widget = client.fetch(&4).await.unwrap();

        assert_eq!(found, widget(Some(4)));
    }

    #[tokio::test]
    async fn cloned_clients_run_concurrently() {
        let transport = std::sync::Arc::new(MockTransport::new());
        transport.respond(200, r#"{"status":"success","data":{"v":"a"}}"#);
        transport.respond(200, r#"{"status":"success","data":{"v":"b"}}"#);
        let client = JsendClient::with_namespace(transport.clone(), "test-namespace");

        let spawned = {
            let client = client.clone();
            tokio::spawn(async move { client.ajax(AjaxRequest::get("one"), "v").await })
        };
        let local = client.ajax(AjaxRequest::get("two"), "v").await.unwrap();
        let remote = spawned.await.unwrap().unwrap();

        let mut seen = vec![local, remote];
        seen.sort_by_key(|v| v.as_ref().and_then(Value::as_str).map(str::to_string));
        assert_eq!(seen, vec![Some(json!("a")), Some(json!("b"))]);

        let mut urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        urls.sort();
        assert_eq!(urls, vec!["one", "two"]);
    }
}
