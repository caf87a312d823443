//! The transport facade the requester talks to.
//!
//! # Design
//! A `Provider` turns a `Service` into an `HttpRequest`, lets plugins
//! rewrite and observe it, and hands it to the underlying `Transport`. The
//! raw result is shown to plugins and then forwarded unchanged. Plugins are
//! a side channel: each hook runs under `catch_unwind`, so a broken plugin
//! cannot stop or alter delivery.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::{HttpRequest, TransportResult};
use crate::plugin::Plugin;
use crate::service::Service;
use crate::transport::{Transport, TransportCompletion};

#[derive(Clone)]
pub struct Provider {
    transport: Arc<dyn Transport>,
    plugins: Arc<[Arc<dyn Plugin>]>,
}

impl Provider {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_plugins(transport, Vec::new())
    }

    pub fn with_plugins(transport: impl Transport + 'static, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            transport: Arc::new(transport),
            plugins: plugins.into(),
        }
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Send `service` and call `completion` exactly once with the raw result.
    pub fn request(&self, service: &Service, cancel: CancellationToken, completion: TransportCompletion) {
        if cancel.is_cancelled() {
            self.finish(service, Err(TransportError::Cancelled), completion);
            return;
        }

        let request = match service.encode() {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(service = %service, %error, "request encoding failed");
                self.finish(service, Err(error), completion);
                return;
            }
        };

        let request = self.prepare(request, service);
        for plugin in self.plugins.iter() {
            guarded("will_send", || plugin.will_send(&request, service));
        }

        let plugins = Arc::clone(&self.plugins);
        let service = service.clone();
        self.transport.send(
            request,
            cancel,
            Box::new(move |result| {
                for plugin in plugins.iter() {
                    guarded("did_receive", || plugin.did_receive(&result, &service));
                }
                completion(result);
            }),
        );
    }

    fn prepare(&self, request: HttpRequest, service: &Service) -> HttpRequest {
        self.plugins.iter().fold(request, |request, plugin| {
            let fallback = request.clone();
            panic::catch_unwind(AssertUnwindSafe(|| plugin.prepare(request, service))).unwrap_or_else(|_| {
                tracing::warn!(hook = "prepare", "plugin panicked; request left unchanged");
                fallback
            })
        })
    }

    fn finish(&self, service: &Service, result: TransportResult, completion: TransportCompletion) {
        for plugin in self.plugins.iter() {
            guarded("did_receive", || plugin.did_receive(&result, service));
        }
        completion(result);
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

fn guarded(hook: &'static str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(hook, "plugin panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, HttpResponse};
    use crate::transport::StubTransport;
    use std::sync::mpsc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Plugin for Recorder {
        fn will_send(&self, request: &HttpRequest, _service: &Service) {
            self.events.lock().unwrap().push(format!("send {}", request.url));
        }

        fn did_receive(&self, result: &TransportResult, _service: &Service) {
            let label = match result {
                Ok(response) => format!("recv {}", response.status),
                Err(error) => format!("fail {error}"),
            };
            self.events.lock().unwrap().push(label);
        }
    }

    struct AddHeader;

    impl Plugin for AddHeader {
        fn prepare(&self, mut request: HttpRequest, _service: &Service) -> HttpRequest {
            request.headers.push(("Authorization".to_string(), "Bearer t".to_string()));
            request
        }
    }

    struct Panicky;

    impl Plugin for Panicky {
        fn prepare(&self, _request: HttpRequest, _service: &Service) -> HttpRequest {
            panic!("prepare failed");
        }

        fn will_send(&self, _request: &HttpRequest, _service: &Service) {
            panic!("will_send failed");
        }

        fn did_receive(&self, _result: &TransportResult, _service: &Service) {
            panic!("did_receive failed");
        }
    }

    fn send(provider: &Provider, service: &Service) -> TransportResult {
        let (tx, rx) = mpsc::channel();
        provider.request(service, CancellationToken::new(), Box::new(move |r| tx.send(r).unwrap()));
        rx.try_recv().unwrap()
    }

    #[test]
    fn plugins_observe_send_and_receive() {
        let recorder = Arc::new(Recorder::default());
        let provider = Provider::with_plugins(StubTransport::sample(), vec![recorder.clone() as Arc<dyn Plugin>]);
        let result = send(&provider, &Service::new("http://h", "a"));
        assert!(result.is_ok());
        assert_eq!(*recorder.events.lock().unwrap(), vec!["send http://h/a", "recv 200"]);
    }

    #[test]
    fn prepare_rewrites_request_before_transport() {
        let transport = StubTransport::new(|request| {
            let auth = request.header("authorization").unwrap_or("none").to_string();
            Ok(HttpResponse::new(200, auth))
        });
        let provider = Provider::with_plugins(transport, vec![Arc::new(AddHeader) as Arc<dyn Plugin>]);
        let response = send(&provider, &Service::new("http://h", "a")).unwrap();
        assert_eq!(&response.body[..], b"Bearer t");
    }

    #[test]
    fn panicking_plugin_does_not_affect_delivery() {
        let recorder = Arc::new(Recorder::default());
        let provider = Provider::with_plugins(
            StubTransport::sample(),
            vec![Arc::new(Panicky) as Arc<dyn Plugin>, recorder.clone() as Arc<dyn Plugin>],
        );
        let response = send(&provider, &Service::new("http://h", "a")).unwrap();
        assert_eq!(&response.body[..], b"Sample data");
        assert_eq!(recorder.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn cancelled_token_skips_transport() {
        let recorder = Arc::new(Recorder::default());
        let provider = Provider::with_plugins(
            StubTransport::new(|_| panic!("transport must not run")),
            vec![recorder.clone() as Arc<dyn Plugin>],
        );
        let (tx, rx) = mpsc::channel();
        let token = CancellationToken::new();
        token.cancel();
        provider.request(&Service::new("http://h", "a"), token, Box::new(move |r| tx.send(r).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), Err(TransportError::Cancelled));
        assert_eq!(*recorder.events.lock().unwrap(), vec!["fail request cancelled"]);
    }

    #[test]
    fn encoding_failure_skips_transport_and_send_hooks() {
        let recorder = Arc::new(Recorder::default());
        let provider = Provider::with_plugins(
            StubTransport::new(|_| panic!("transport must not run")),
            vec![recorder.clone() as Arc<dyn Plugin>],
        );
        let service = Service::new("http://h", "a").with_header("Bad Name", "v");
        let result = send(&provider, &service);
        assert_eq!(
            result,
            Err(TransportError::Encoding("invalid header name \"Bad Name\"".to_string()))
        );
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["fail request encoding failed: invalid header name \"Bad Name\""]
        );
    }

    #[test]
    fn transport_failure_reaches_plugins_and_caller() {
        let recorder = Arc::new(Recorder::default());
        let provider = Provider::with_plugins(
            StubTransport::failing(TransportError::Network("reset".to_string())),
            vec![recorder.clone() as Arc<dyn Plugin>],
        );
        let service = Service::new("http://h", "a").with_method(HttpMethod::Post);
        let result = send(&provider, &service);
        assert_eq!(result, Err(TransportError::Network("reset".to_string())));
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["send http://h/a", "fail network error: reset"]
        );
    }
}
