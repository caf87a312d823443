//! HTTP request and response values exchanged with a transport.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! crate encodes a `Service` into an `HttpRequest` and hands it to a
//! `Transport`; the transport answers with a `TransportResult`. Nothing in
//! this module performs I/O.
//!
//! Header lists keep insertion order and allow duplicates, matching what goes
//! over the wire. Bodies are `Bytes` so a result can be observed by plugins
//! and then consumed by a mapping without copying.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }

    /// Methods whose URL-encoded parameters travel in the query string.
    pub fn encodes_parameters_in_url(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload source of an upload task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Data(Bytes),
    File(PathBuf),
}

/// What kind of round trip the transport performs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TaskKind {
    /// An ordinary request; the response body is returned in memory.
    #[default]
    Plain,
    /// Send the given payload as the request body.
    Upload(UploadSource),
    /// Write the response body to `destination` as well as returning it.
    Download { destination: PathBuf },
}

/// An encoded HTTP request, ready for a transport.
///
/// Built by `Service::encode`. `body` is `None` when the request carries no
/// payload or when the payload is an upload file the transport must read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub task: TaskKind,
    pub sample_payload: Bytes,
}

impl HttpRequest {
    /// First header value whose name matches `name` case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Outcome of one transport round trip. Produced once per request.
pub type TransportResult = Result<HttpResponse, TransportError>;

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
