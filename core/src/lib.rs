//! Typed HTTP requests over a pluggable transport.
//!
//! # Overview
//! A `Service` describes one HTTP call: address, method, parameters and
//! their encoding, headers, task kind and a sample payload. Attaching a
//! `ResultMapping` turns it into a `RequestDescriptor<T>`, whose raw
//! transport result is mapped into a `T`. A `Requester` sends descriptors
//! through a `Provider` (transport plus plugins), runs the mapping on a
//! worker executor and delivers the value on the executor captured when the
//! request was made.
//!
//! # Design
//! - Networking, pooling, TLS, timeouts and retries belong to the
//!   `Transport`. `UreqTransport` is the default network transport;
//!   `StubTransport` answers from closures or sample payloads.
//! - Execution contexts are explicit `Executor` values, never thread-locals,
//!   so tests can drive scheduling with a `SerialQueue`.
//! - Logging is a `Plugin` on the provider and cannot influence delivery.

pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod http;
pub mod logger;
pub mod mapping;
pub mod plugin;
pub mod provider;
pub mod requester;
pub mod service;
pub mod transport;

pub use descriptor::RequestDescriptor;
pub use encoding::{ParameterEncoding, Parameters};
pub use error::{ExecutorError, RequestError, TransportError};
pub use executor::{Executor, Job, SerialQueue, TokioExecutor, WorkerPool, WorkerPoolBuilder};
pub use http::{HttpMethod, HttpRequest, HttpResponse, TaskKind, TransportResult, UploadSource};
pub use logger::{LogKind, LogSink, LoggerConfig, LoggerPlugin, TracingSink};
pub use mapping::{Mapping, ResultMapping};
pub use plugin::Plugin;
pub use provider::Provider;
pub use requester::{RequestHandle, Requester};
pub use service::{Service, Target};
pub use tokio_util::sync::CancellationToken;
pub use transport::{StubBehavior, StubTransport, Transport, TransportCompletion};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
