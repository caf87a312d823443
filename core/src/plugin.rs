//! Observer hooks invoked by the `Provider` around each round trip.

use crate::http::{HttpRequest, TransportResult};
use crate::service::Service;

/// A side channel onto requests and results.
///
/// Hooks run on whatever thread the provider or transport is on. A panicking
/// hook is logged and ignored; it never changes what the caller receives.
pub trait Plugin: Send + Sync {
    /// Rewrite the request before it is sent (e.g. add an auth header).
    fn prepare(&self, request: HttpRequest, _service: &Service) -> HttpRequest {
        request
    }

    /// Called just before the request is handed to the transport.
    fn will_send(&self, _request: &HttpRequest, _service: &Service) {}

    /// Called with the raw result before it is forwarded to the requester.
    fn did_receive(&self, _result: &TransportResult, _service: &Service) {}
}
