//! Result mappings: pure functions from a transport result to a typed value.
//!
//! # Design
//! A `Mapping` is an `Arc`-wrapped closure, so one mapping can be shared by
//! many descriptors and invoked concurrently. Mappings compose: `f.then(&g)`
//! runs `f` and feeds its output to `g`, and `Mapping::identity()` is the
//! neutral element.
//!
//! Transport failures are not short-circuited. A `ResultMapping` receives the
//! whole `TransportResult` and decides for itself whether a failure becomes
//! an error value, a degraded success, or a sentinel (see `recover`).
//! Panics inside a mapping are not caught here.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{RequestError, TransportError};
use crate::http::{HttpResponse, TransportResult};

/// A shareable, composable `I -> O` function.
pub struct Mapping<I, O> {
    f: Arc<dyn Fn(I) -> O + Send + Sync>,
}

/// A mapping from a raw transport result to an application value.
pub type ResultMapping<T> = Mapping<TransportResult, T>;

impl<I, O> Mapping<I, O> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Apply the mapping.
    pub fn map(&self, input: I) -> O {
        (self.f)(input)
    }

    /// `self` followed by `next`.
    pub fn then<P>(&self, next: &Mapping<O, P>) -> Mapping<I, P>
    where
        I: 'static,
        O: 'static,
        P: 'static,
    {
        let first = Arc::clone(&self.f);
        let second = Arc::clone(&next.f);
        Mapping {
            f: Arc::new(move |input| second(first(input))),
        }
    }

    /// `self` followed by the closure `f`.
    pub fn map_output<P, F>(&self, f: F) -> Mapping<I, P>
    where
        I: 'static,
        O: 'static,
        P: 'static,
        F: Fn(O) -> P + Send + Sync + 'static,
    {
        self.then(&Mapping::new(f))
    }
}

impl<T: 'static> Mapping<T, T> {
    pub fn identity() -> Self {
        Self::new(|input| input)
    }
}

impl<I, O> Clone for Mapping<I, O> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<I, O> fmt::Debug for Mapping<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping").finish_non_exhaustive()
    }
}

/// Pass 2xx responses through; turn everything else into a `RequestError`.
pub fn successful() -> ResultMapping<Result<HttpResponse, RequestError>> {
    Mapping::new(|result: TransportResult| {
        let response = result?;
        check_success(&response)?;
        Ok(response)
    })
}

/// The status code of any response that arrived.
pub fn status() -> ResultMapping<Result<u16, RequestError>> {
    Mapping::new(|result: TransportResult| Ok(result?.status))
}

/// The body of a 2xx response.
pub fn bytes() -> ResultMapping<Result<Bytes, RequestError>> {
    successful().map_output(|result| result.map(|response| response.body))
}

/// The body of a 2xx response as UTF-8 text.
pub fn text() -> ResultMapping<Result<String, RequestError>> {
    successful().map_output(|result| {
        let response = result?;
        String::from_utf8(response.body.to_vec()).map_err(|e| RequestError::Decode(e.to_string()))
    })
}

/// Decode the JSON body of a 2xx response.
pub fn json<D>() -> ResultMapping<Result<D, RequestError>>
where
    D: DeserializeOwned + 'static,
{
    Mapping::new(|result: TransportResult| {
        let response = result?;
        check_success(&response)?;
        decode(&response)
    })
}

/// Decode the JSON body of a response with exactly `expected` status.
pub fn json_with_status<D>(expected: u16) -> ResultMapping<Result<D, RequestError>>
where
    D: DeserializeOwned + 'static,
{
    Mapping::new(move |result: TransportResult| {
        let response = result?;
        check_status(&response, expected)?;
        decode(&response)
    })
}

/// Run `on_response` for responses and `fallback` for transport failures.
///
/// Every transport failure becomes a value of the output type, so a failing
/// transport still delivers something meaningful to the caller.
pub fn recover<T, R, F>(on_response: R, fallback: F) -> ResultMapping<T>
where
    T: 'static,
    R: Fn(HttpResponse) -> T + Send + Sync + 'static,
    F: Fn(TransportError) -> T + Send + Sync + 'static,
{
    Mapping::new(move |result: TransportResult| match result {
        Ok(response) => on_response(response),
        Err(error) => fallback(error),
    })
}

fn decode<D: DeserializeOwned>(response: &HttpResponse) -> Result<D, RequestError> {
    serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
}

fn check_success(response: &HttpResponse) -> Result<(), RequestError> {
    if response.is_success() {
        return Ok(());
    }
    Err(status_error(response))
}

/// Map any status other than `expected` to the appropriate `RequestError`.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), RequestError> {
    if response.status == expected {
        return Ok(());
    }
    Err(status_error(response))
}

fn status_error(response: &HttpResponse) -> RequestError {
    if response.status == 404 {
        return RequestError::NotFound;
    }
    RequestError::Status {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    }
}
