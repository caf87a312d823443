//! Untyped request descriptions.
//!
//! # Design
//! A `Service` is an immutable value describing one HTTP call: where it goes,
//! how parameters are encoded, which headers it carries and what kind of task
//! the transport performs. It is assembled with consuming setters and then
//! only read. No URL validation happens here; malformed addresses surface as
//! transport errors.

use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::encoding::{self, ParameterEncoding, Parameters, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, TaskKind, UploadSource};

/// Placeholder response body used by stub transports.
pub const DEFAULT_SAMPLE_PAYLOAD: &[u8] = b"Sample data";

/// Anything that can be sent through a `Provider`.
pub trait Target {
    fn service(&self) -> &Service;
}

/// Description of one HTTP call without a response mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    base_url: String,
    path: String,
    method: HttpMethod,
    parameters: Option<Parameters>,
    encoding: ParameterEncoding,
    headers: Option<Vec<(String, String)>>,
    task: TaskKind,
    sample_payload: Bytes,
}

impl Service {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            method: HttpMethod::default(),
            parameters: None,
            encoding: ParameterEncoding::default(),
            headers: None,
            task: TaskKind::default(),
            sample_payload: Bytes::from_static(DEFAULT_SAMPLE_PAYLOAD),
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Add a single parameter, creating the map if needed.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(Parameters::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_task(mut self, task: TaskKind) -> Self {
        self.task = task;
        self
    }

    pub fn with_sample_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.sample_payload = payload.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn encoding(&self) -> ParameterEncoding {
        self.encoding
    }

    pub fn headers(&self) -> Option<&[(String, String)]> {
        self.headers.as_deref()
    }

    pub fn task(&self) -> &TaskKind {
        &self.task
    }

    pub fn sample_payload(&self) -> &Bytes {
        &self.sample_payload
    }

    /// `base_url` joined with `path` by exactly one `/`.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Encode into the request a transport executes.
    ///
    /// Fails with `TransportError::Encoding` when a header name is not an
    /// HTTP token or a header value contains CR, LF or NUL.
    pub fn encode(&self) -> Result<HttpRequest, TransportError> {
        let mut url = self.url();
        let mut headers = self.headers.clone().unwrap_or_default();
        for (name, value) in &headers {
            check_header(name, value)?;
        }
        let mut body = None;
        let parameters = self.parameters.as_ref().filter(|p| !p.is_empty());

        match &self.task {
            TaskKind::Upload(source) => {
                if let Some(parameters) = parameters {
                    encoding::append_query(&mut url, &encoding::query_string(parameters));
                }
                if let UploadSource::Data(data) = source {
                    body = Some(data.clone());
                }
            }
            TaskKind::Plain | TaskKind::Download { .. } => {
                if let Some(parameters) = parameters {
                    match self.encoding {
                        ParameterEncoding::Url if self.method.encodes_parameters_in_url() => {
                            encoding::append_query(&mut url, &encoding::query_string(parameters));
                        }
                        ParameterEncoding::UrlQuery => {
                            encoding::append_query(&mut url, &encoding::query_string(parameters));
                        }
                        ParameterEncoding::Url | ParameterEncoding::UrlBody => {
                            body = Some(Bytes::from(encoding::query_string(parameters)));
                            set_default_header(&mut headers, "Content-Type", FORM_CONTENT_TYPE);
                        }
                        ParameterEncoding::Json => {
                            let json = serde_json::to_vec(parameters)
                                .map_err(|e| TransportError::Encoding(e.to_string()))?;
                            body = Some(Bytes::from(json));
                            set_default_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
                        }
                    }
                }
            }
        }

        Ok(HttpRequest {
            method: self.method,
            url,
            headers,
            body,
            task: self.task.clone(),
            sample_payload: self.sample_payload.clone(),
        })
    }
}

impl Target for Service {
    fn service(&self) -> &Service {
        self
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url())
    }
}

fn check_header(name: &str, value: &str) -> Result<(), TransportError> {
    let is_token = |b: u8| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b);
    if name.is_empty() || !name.bytes().all(is_token) {
        return Err(TransportError::Encoding(format!("invalid header name {name:?}")));
    }
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(TransportError::Encoding(format!("invalid value for header {name}")));
    }
    Ok(())
}

fn set_default_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if crate::http::find_header(headers, name).is_none() {
        headers.push((name.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn service() -> Service {
        Service::new("http://localhost:3000", "/items")
    }

    #[test]
    fn defaults_match_a_plain_get() {
        let s = service();
        assert_eq!(s.method(), HttpMethod::Get);
        assert!(s.parameters().is_none());
        assert_eq!(s.encoding(), ParameterEncoding::Url);
        assert!(s.headers().is_none());
        assert_eq!(s.task(), &TaskKind::Plain);
        assert_eq!(&s.sample_payload()[..], b"Sample data");
    }

    #[test]
    fn url_joins_with_single_slash() {
        assert_eq!(service().url(), "http://localhost:3000/items");
        assert_eq!(
            Service::new("http://localhost:3000/", "items").url(),
            "http://localhost:3000/items"
        );
        assert_eq!(Service::new("http://h/api", "").url(), "http://h/api");
    }

    #[test]
    fn get_parameters_go_to_query() {
        let req = service().with_parameter("page", 2).with_parameter("q", "a b").encode().unwrap();
        assert_eq!(req.url, "http://localhost:3000/items?page=2&q=a%20b");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn post_parameters_go_to_form_body() {
        let req = service()
            .with_method(HttpMethod::Post)
            .with_parameter("name", "x")
            .encode()
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/items");
        assert_eq!(req.body.as_deref(), Some(&b"name=x"[..]));
        assert_eq!(req.header("content-type"), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn json_encoding_writes_body_and_content_type() {
        let req = service()
            .with_method(HttpMethod::Put)
            .with_encoding(ParameterEncoding::Json)
            .with_parameters(json!({"done": true}).as_object().cloned().unwrap())
            .encode()
            .unwrap();
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"done": true}));
        assert_eq!(req.header("Content-Type"), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let req = service()
            .with_method(HttpMethod::Post)
            .with_encoding(ParameterEncoding::Json)
            .with_header("content-type", "application/vnd.api+json")
            .with_parameter("a", 1)
            .encode()
            .unwrap();
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("Content-Type"), Some("application/vnd.api+json"));
    }

    #[test]
    fn query_encoding_forces_query_for_post() {
        let req = service()
            .with_method(HttpMethod::Post)
            .with_encoding(ParameterEncoding::UrlQuery)
            .with_parameter("a", 1)
            .encode()
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/items?a=1");
        assert!(req.body.is_none());
    }

    #[test]
    fn upload_data_is_body_and_parameters_go_to_query() {
        let req = service()
            .with_method(HttpMethod::Post)
            .with_encoding(ParameterEncoding::Json)
            .with_parameter("name", "photo")
            .with_task(TaskKind::Upload(UploadSource::Data(Bytes::from_static(b"raw"))))
            .encode()
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/items?name=photo");
        assert_eq!(req.body.as_deref(), Some(&b"raw"[..]));
    }

    #[test]
    fn malformed_headers_fail_encoding() {
        let bad_name = service().with_header("X Trace", "1").encode();
        assert!(matches!(bad_name, Err(TransportError::Encoding(_))));

        let bad_value = service().with_header("X-Trace", "a\r\nInjected: 1").encode();
        assert_eq!(
            bad_value.unwrap_err(),
            TransportError::Encoding("invalid value for header X-Trace".to_string())
        );

        assert!(service().with_header("X-Trace_id.v2", "ok value").encode().is_ok());
    }

    #[test]
    fn upload_file_leaves_body_to_transport() {
        let req = service()
            .with_method(HttpMethod::Put)
            .with_task(TaskKind::Upload(UploadSource::File(PathBuf::from("/tmp/x"))))
            .encode()
            .unwrap();
        assert!(req.body.is_none());
        assert!(matches!(req.task, TaskKind::Upload(UploadSource::File(_))));
    }

    #[test]
    fn empty_parameter_map_adds_nothing() {
        let req = service()
            .with_method(HttpMethod::Post)
            .with_parameters(Parameters::new())
            .encode()
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/items");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn display_shows_method_and_url() {
        let s = service().with_method(HttpMethod::Delete);
        assert_eq!(s.to_string(), "DELETE http://localhost:3000/items");
    }
}
