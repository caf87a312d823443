use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, TransportResult};
use crate::transport::{Transport, TransportCompletion};

type Responder = Arc<dyn Fn(&HttpRequest) -> TransportResult + Send + Sync>;

/// When a stubbed response is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StubBehavior {
    /// Complete inline, on the thread that called `send`.
    #[default]
    Immediate,
    /// Complete from a background thread after the delay.
    Delayed(Duration),
}

/// A transport that answers from a closure instead of the network.
#[derive(Clone)]
pub struct StubTransport {
    responder: Responder,
    behavior: StubBehavior,
}

impl StubTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> TransportResult + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            behavior: StubBehavior::default(),
        }
    }

    /// Answer every request with status 200 and its sample payload.
    pub fn sample() -> Self {
        Self::new(|request| Ok(HttpResponse::new(200, request.sample_payload.clone())))
    }

    /// Fail every request with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn with_behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

impl Transport for StubTransport {
    fn send(&self, request: HttpRequest, cancel: CancellationToken, completion: TransportCompletion) {
        match self.behavior {
            StubBehavior::Immediate => {
                let result = respond(&self.responder, &request, &cancel);
                completion(result);
            }
            StubBehavior::Delayed(delay) => {
                let responder = Arc::clone(&self.responder);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    let result = respond(&responder, &request, &cancel);
                    completion(result);
                });
            }
        }
    }
}

impl fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTransport")
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

fn respond(responder: &Responder, request: &HttpRequest, cancel: &CancellationToken) -> TransportResult {
    if cancel.is_cancelled() {
        return Err(TransportError::Cancelled);
    }
    responder(request)
}
