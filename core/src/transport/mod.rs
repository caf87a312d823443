//! Transports: the components that actually perform HTTP round trips.
//!
//! A transport receives an encoded `HttpRequest` and must call its
//! completion exactly once, on whatever thread suits it. Retries, pooling,
//! TLS and timeouts all live here, not in the requester.

mod stub;
#[cfg(feature = "ureq")]
mod ureq_transport;

use tokio_util::sync::CancellationToken;

use crate::http::{HttpRequest, TransportResult};

pub use stub::{StubBehavior, StubTransport};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;

/// Callback receiving the single result of a round trip.
pub type TransportCompletion = Box<dyn FnOnce(TransportResult) + Send + 'static>;

pub trait Transport: Send + Sync {
    /// Start the round trip described by `request`.
    ///
    /// Transports that can abort in-flight work should watch `cancel` and
    /// complete with `TransportError::Cancelled`.
    fn send(&self, request: HttpRequest, cancel: CancellationToken, completion: TransportCompletion);
}
