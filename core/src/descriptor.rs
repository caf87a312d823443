//! Typed request descriptors.
//!
//! A `RequestDescriptor<T>` is a `Service` plus the `ResultMapping` that turns
//! its transport result into a `T`. A descriptor built from a bare service
//! has the identity mapping and therefore yields the raw `TransportResult`;
//! every other output type requires a mapping to be supplied.

use std::fmt;

use bytes::Bytes;

use crate::encoding::{ParameterEncoding, Parameters};
use crate::http::{HttpMethod, TaskKind, TransportResult};
use crate::mapping::{Mapping, ResultMapping};
use crate::service::{Service, Target};

pub struct RequestDescriptor<T> {
    service: Service,
    mapping: ResultMapping<T>,
}

impl<T> Clone for RequestDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            mapping: self.mapping.clone(),
        }
    }
}

impl<T> fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl RequestDescriptor<TransportResult> {
    /// A descriptor that delivers the raw transport result.
    pub fn new(service: Service) -> Self {
        Self {
            service,
            mapping: Mapping::identity(),
        }
    }
}

impl<T> RequestDescriptor<T> {
    pub fn with_service(service: Service, mapping: ResultMapping<T>) -> Self {
        Self { service, mapping }
    }

    /// Replace the mapping, changing the output type.
    pub fn with_mapping<U>(self, mapping: ResultMapping<U>) -> RequestDescriptor<U> {
        RequestDescriptor {
            service: self.service,
            mapping,
        }
    }

    /// Late-bind a mapping of the same output type, e.g. one that closes over
    /// state that did not exist when the descriptor was built.
    pub fn set_mapping(&mut self, mapping: ResultMapping<T>) {
        self.mapping = mapping;
    }

    pub fn mapping(&self) -> &ResultMapping<T> {
        &self.mapping
    }

    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }

    pub fn path(&self) -> &str {
        self.service.path()
    }

    pub fn method(&self) -> HttpMethod {
        self.service.method()
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.service.parameters()
    }

    pub fn encoding(&self) -> ParameterEncoding {
        self.service.encoding()
    }

    pub fn headers(&self) -> Option<&[(String, String)]> {
        self.service.headers()
    }

    pub fn task(&self) -> &TaskKind {
        self.service.task()
    }

    pub fn sample_payload(&self) -> &Bytes {
        self.service.sample_payload()
    }
}

impl<T> Target for RequestDescriptor<T> {
    fn service(&self) -> &Service {
        &self.service
    }
}

impl Service {
    /// Attach a mapping, producing a typed descriptor.
    pub fn mapped<T>(self, mapping: ResultMapping<T>) -> RequestDescriptor<T> {
        RequestDescriptor::with_service(self, mapping)
    }
}
