//! Typed request execution.
//!
//! # Design
//! `request` relays a result across two execution contexts:
//!
//! 1. The delivery executor is captured synchronously when `request` is
//!    called.
//! 2. When the transport completes, the mapping runs on the worker executor.
//! 3. The mapped value is delivered on the captured executor.
//!
//! Mapping always runs, including for transport failures and cancellation,
//! so every request ends in exactly one delivery. A panic inside a mapping
//! is caught on the worker and resumed on the delivery context, where the
//! caller's own error handling sees it.
//!
//! `request_simple` skips mapping and both hops: the raw result is handed to
//! the completion on the transport's thread.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::descriptor::RequestDescriptor;
use crate::error::RequestError;
use crate::executor::Executor;
use crate::http::TransportResult;
use crate::provider::Provider;
use crate::service::Target;

/// Identifies an in-flight request and allows cancelling it.
///
/// Dropping the handle does not cancel the request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: Uuid,
    token: CancellationToken,
}

impl RequestHandle {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the transport to abandon the request. The completion still runs,
    /// with the mapping applied to `TransportError::Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Clone)]
pub struct Requester {
    provider: Provider,
    worker: Arc<dyn Executor>,
    delivery: Arc<dyn Executor>,
}

impl Requester {
    pub fn new(provider: Provider, worker: Arc<dyn Executor>, delivery: Arc<dyn Executor>) -> Self {
        Self {
            provider,
            worker,
            delivery,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Send `descriptor`, map the result on the worker and deliver it on the
    /// requester's delivery executor.
    pub fn request<T, F>(&self, descriptor: &RequestDescriptor<T>, completion: F) -> RequestHandle
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.request_on(descriptor, &self.delivery, completion)
    }

    /// Like `request`, but deliver on `delivery`.
    pub fn request_on<T, F>(
        &self,
        descriptor: &RequestDescriptor<T>,
        delivery: &Arc<dyn Executor>,
        completion: F,
    ) -> RequestHandle
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let handle = RequestHandle::new();
        let id = handle.id;
        let delivery = Arc::clone(delivery);
        let worker = Arc::clone(&self.worker);
        let mapping = descriptor.mapping().clone();
        tracing::debug!(request_id = %id, service = %descriptor.service(), "request submitted");

        self.provider.request(
            descriptor.service(),
            handle.token.clone(),
            Box::new(move |result: TransportResult| {
                tracing::debug!(request_id = %id, succeeded = result.is_ok(), "transport completed");
                worker.execute(Box::new(move || {
                    let mapped = panic::catch_unwind(AssertUnwindSafe(|| mapping.map(result)));
                    tracing::debug!(request_id = %id, panicked = mapped.is_err(), "result mapped");
                    delivery.execute(Box::new(move || match mapped {
                        Ok(value) => {
                            completion(value);
                            tracing::debug!(request_id = %id, "result delivered");
                        }
                        Err(payload) => {
                            tracing::error!(request_id = %id, "mapping panicked");
                            panic::resume_unwind(payload);
                        }
                    }));
                }));
            }),
        );
        handle
    }

    /// Send `target` and hand the raw result to `completion` on the
    /// transport's completion thread. No mapping, no executor hops.
    pub fn request_simple<F>(&self, target: &impl Target, completion: F) -> RequestHandle
    where
        F: FnOnce(TransportResult) + Send + 'static,
    {
        let handle = RequestHandle::new();
        tracing::debug!(request_id = %handle.id, service = %target.service(), "simple request submitted");
        self.provider
            .request(target.service(), handle.token.clone(), Box::new(completion));
        handle
    }

    /// Await the mapped value of `descriptor`.
    ///
    /// The mapping runs on the worker; the value goes straight to the
    /// awaiting task. Fails with `RequestError::Abandoned` if the mapping
    /// panicked.
    pub async fn fetch<T>(&self, descriptor: &RequestDescriptor<T>) -> Result<T, RequestError>
    where
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let worker = Arc::clone(&self.worker);
        let mapping = descriptor.mapping().clone();
        let id = Uuid::new_v4();
        tracing::debug!(request_id = %id, service = %descriptor.service(), "fetch submitted");

        self.provider.request(
            descriptor.service(),
            CancellationToken::new(),
            Box::new(move |result: TransportResult| {
                worker.execute(Box::new(move || {
                    // A panic drops `tx`, which the receiver reports as abandoned.
                    let value = mapping.map(result);
                    let _ = tx.send(value);
                }));
            }),
        );

        rx.await.map_err(|_| {
            tracing::error!(request_id = %id, "fetch abandoned before delivery");
            RequestError::Abandoned
        })
    }
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
