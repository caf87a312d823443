use std::fmt;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use ureq::http::Response;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TaskKind, TransportResult, UploadSource};
use crate::transport::{Transport, TransportCompletion};

/// Blocking `ureq` transport; each round trip runs on its own thread.
///
/// Non-2xx statuses are returned as responses, not errors, so mappings can
/// interpret them. `ureq` cannot abort a request mid-flight, so the
/// cancellation token is checked before sending and after receiving.
///
/// Threads are not pooled or bounded: every in-flight request holds one OS
/// thread until its round trip ends. Callers issuing many concurrent
/// requests should bound them upstream or supply their own `Transport`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. It should have `http_status_as_error(false)`.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest, cancel: CancellationToken, completion: TransportCompletion) {
        let agent = self.agent.clone();
        std::thread::spawn(move || {
            let result = if cancel.is_cancelled() {
                Err(TransportError::Cancelled)
            } else {
                execute(&agent, &request)
            };
            let result = match result {
                Ok(_) if cancel.is_cancelled() => Err(TransportError::Cancelled),
                other => other,
            };
            completion(result);
        });
    }
}

fn execute(agent: &Agent, request: &HttpRequest) -> TransportResult {
    let body = match &request.task {
        TaskKind::Upload(UploadSource::File(path)) => {
            let data = std::fs::read(path)
                .map_err(|e| TransportError::Io(format!("{}: {e}", path.display())))?;
            Some(Bytes::from(data))
        }
        _ => request.body.clone(),
    };

    let url = request.url.as_str();
    let body = body.as_deref();
    let sent = match request.method {
        HttpMethod::Get => without_body(agent.get(url), request, body),
        HttpMethod::Head => without_body(agent.head(url), request, body),
        HttpMethod::Delete => without_body(agent.delete(url), request, body),
        HttpMethod::Options => without_body(agent.options(url), request, body),
        HttpMethod::Trace => without_body(agent.trace(url), request, body),
        HttpMethod::Connect => without_body(agent.connect(url), request, body),
        HttpMethod::Post => with_body(agent.post(url), request, body),
        HttpMethod::Put => with_body(agent.put(url), request, body),
        HttpMethod::Patch => with_body(agent.patch(url), request, body),
    };
    let mut response = sent.map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let data = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| TransportError::Network(e.to_string()))?;

    if let TaskKind::Download { destination } = &request.task {
        std::fs::write(destination, &data)
            .map_err(|e| TransportError::Io(format!("{}: {e}", destination.display())))?;
    }

    Ok(HttpResponse {
        status,
        headers,
        body: Bytes::from(data),
    })
}

fn apply_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn without_body(
    builder: RequestBuilder<WithoutBody>,
    request: &HttpRequest,
    body: Option<&[u8]>,
) -> Result<Response<Body>, ureq::Error> {
    if body.is_some_and(|body| !body.is_empty()) {
        tracing::warn!(method = %request.method, url = %request.url, "dropping body of bodiless method");
    }
    apply_headers(builder, &request.headers).call()
}

fn with_body(
    builder: RequestBuilder<WithBody>,
    request: &HttpRequest,
    body: Option<&[u8]>,
) -> Result<Response<Body>, ureq::Error> {
    let builder = apply_headers(builder, &request.headers);
    match body {
        Some(body) => builder.send(body),
        None => builder.send_empty(),
    }
}
