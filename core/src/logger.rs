//! Diagnostic logging of requests and responses.
//!
//! # Design
//! `LoggerPlugin` is a `Plugin`, so it sees traffic through the provider's
//! side channel and never touches the requester's data flow. Each hook
//! renders a list of lines and classifies them:
//!
//! - responses with status >= 500 and transport failures are `Error`
//! - responses with status >= 300 are `Warning`
//! - everything else is `Standard`
//!
//! In verbose mode every line is a separate sink call; in compact mode the
//! lines are joined with the configured separator and emitted once.
//! Headers and bodies are only rendered when `debug_fields` is on, which
//! defaults to whether this is a debug build.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::http::{HttpRequest, TransportResult};
use crate::plugin::Plugin;
use crate::service::Service;

/// Severity of a group of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Standard,
    Warning,
    Error,
}

impl LogKind {
    pub fn for_status(status: u16) -> Self {
        if status >= 500 {
            LogKind::Error
        } else if status >= 300 {
            LogKind::Warning
        } else {
            LogKind::Standard
        }
    }
}

/// Destination of rendered log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, kind: LogKind, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(LogKind, &str) + Send + Sync,
{
    fn emit(&self, kind: LogKind, message: &str) {
        self(kind, message)
    }
}

/// Forwards lines to `tracing`: debug, warn and error respectively.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, kind: LogKind, message: &str) {
        match kind {
            LogKind::Standard => tracing::debug!("{message}"),
            LogKind::Warning => tracing::warn!("{message}"),
            LogKind::Error => tracing::error!("{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// One sink call per line, and include bodies when `debug_fields` is on.
    pub verbose: bool,
    /// Render requests as a single curl command.
    pub curl: bool,
    /// Include headers and bodies.
    pub debug_fields: bool,
    pub logger_id: String,
    pub separator: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            curl: false,
            debug_fields: cfg!(debug_assertions),
            logger_id: "Default".to_string(),
            separator: "\n ".to_string(),
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `REQUESTER_LOG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let flag = |key: &str| {
            lookup(key).and_then(|value| match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            })
        };
        if let Some(verbose) = flag("REQUESTER_LOG_VERBOSE") {
            config.verbose = verbose;
        }
        if let Some(curl) = flag("REQUESTER_LOG_CURL") {
            config.curl = curl;
        }
        if let Some(debug_fields) = flag("REQUESTER_LOG_DEBUG_FIELDS") {
            config.debug_fields = debug_fields;
        }
        if let Some(id) = lookup("REQUESTER_LOG_ID") {
            config.logger_id = id;
        }
        if let Some(separator) = lookup("REQUESTER_LOG_SEPARATOR") {
            config.separator = separator;
        }
        config
    }
}

type ResponseFormatter = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

pub struct LoggerPlugin {
    config: LoggerConfig,
    sink: Arc<dyn LogSink>,
    response_formatter: Option<ResponseFormatter>,
}

impl LoggerPlugin {
    pub fn new(config: LoggerConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }

    pub fn with_sink(config: LoggerConfig, sink: impl LogSink + 'static) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            response_formatter: None,
        }
    }

    /// Transform response bodies before they are logged, e.g. to redact or
    /// pretty-print them.
    pub fn with_response_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        self.response_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    fn line(&self, identifier: &str, message: &str) -> String {
        format!("{}: {identifier}: {message}", self.config.logger_id)
    }

    fn output(&self, lines: &[String], kind: LogKind) {
        if lines.is_empty() {
            return;
        }
        if self.config.verbose {
            for line in lines {
                self.sink.emit(kind, line);
            }
        } else {
            self.sink.emit(kind, &lines.join(&self.config.separator));
        }
    }

    fn request_lines(&self, request: &HttpRequest) -> Vec<String> {
        let mut lines = vec![self.line("Request", &request.url)];
        if self.config.debug_fields {
            lines.push(self.line("Request Headers", &format_headers(&request.headers)));
        }
        lines.push(self.line("HTTP Request Method", request.method.as_str()));
        if self.config.debug_fields && self.config.verbose {
            if let Some(body) = request.body.as_ref().and_then(|b| std::str::from_utf8(b).ok()) {
                lines.push(self.line("Request Body", body));
            }
        }
        lines
    }

    fn response_lines(&self, result: &TransportResult, service: &Service) -> Vec<String> {
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                let message = format!("Received empty network response for {service}: {error}");
                return vec![self.line("Response", &message)];
            }
        };

        let mut lines = vec![self.line(
            "Response",
            &format!("Status Code: {}, URL: {}", response.status, service.url()),
        )];
        if self.config.debug_fields && self.config.verbose {
            let body = match &self.response_formatter {
                Some(formatter) => formatter(&response.body),
                None => response.body.to_vec(),
            };
            if let Ok(text) = String::from_utf8(body) {
                if !text.is_empty() {
                    lines.push(text);
                }
            }
        }
        lines
    }
}

impl Plugin for LoggerPlugin {
    fn will_send(&self, request: &HttpRequest, _service: &Service) {
        if self.config.curl {
            self.sink.emit(LogKind::Standard, &curl_command(request));
            return;
        }
        self.output(&self.request_lines(request), LogKind::Standard);
    }

    fn did_receive(&self, result: &TransportResult, service: &Service) {
        let kind = match result {
            Ok(response) => LogKind::for_status(response.status),
            Err(_) => LogKind::Error,
        };
        self.output(&self.response_lines(result, service), kind);
    }
}

impl fmt::Debug for LoggerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerPlugin")
            .field("config", &self.config)
            .field("response_formatter", &self.response_formatter.is_some())
            .finish_non_exhaustive()
    }
}

fn format_headers(headers: &[(String, String)]) -> String {
    let pairs: Vec<String> = headers.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("[{}]", pairs.join(", "))
}

/// Render `request` as an equivalent curl invocation.
pub fn curl_command(request: &HttpRequest) -> String {
    let mut parts = vec!["$ curl -i".to_string()];
    if request.method.as_str() != "GET" {
        parts.push(format!("-X {}", request.method));
    }
    for (name, value) in &request.headers {
        parts.push(format!("-H \"{}: {}\"", escape(name), escape(value)));
    }
    if let Some(body) = request.body.as_ref().and_then(|b| std::str::from_utf8(b).ok()) {
        parts.push(format!("-d \"{}\"", escape(body)));
    }
    parts.push(format!("\"{}\"", escape(&request.url)));
    parts.join(" \\\n\t")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
