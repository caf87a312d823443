//! Error types for the requester.
//!
//! # Design
//! `TransportError` is what a transport reports instead of a response. It is
//! `Clone` because the same failure is shown to plugins before a mapping
//! consumes it. `RequestError` is the application-level failure produced by
//! the ready-made mappings; `NotFound` gets its own variant because callers
//! routinely branch on it.

use thiserror::Error;

/// A round trip that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The service could not be turned into a request, e.g. a malformed header.
    #[error("request encoding failed: {0}")]
    Encoding(String),

    /// Connection, DNS, TLS or protocol failure reported by the transport.
    #[error("network error: {0}")]
    Network(String),

    /// Reading an upload file or writing a download destination failed.
    #[error("i/o error: {0}")]
    Io(String),

    /// The request was cancelled through its `RequestHandle`.
    #[error("request cancelled")]
    Cancelled,
}

/// Failures surfaced by the mappings in `crate::mapping`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status the mapping does not accept.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded into the expected type.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// The request finished without delivering a value (the mapping panicked).
    #[error("request abandoned before delivery")]
    Abandoned,
}

/// Failures creating an execution context.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    #[error("failed to start worker threads: {0}")]
    Spawn(#[from] std::io::Error),
}
