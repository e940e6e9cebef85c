//! `Resource` implementation over a `Transport`.
//!
//! # Design
//! One call is one linear pass: merge options, build the request, consult the
//! gate, execute, parse, split on status. Nothing is retried and no state is
//! kept between calls apart from the stored defaults, which only change
//! through `&mut self` setters.

use std::fmt::Display;
use std::time::Duration;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::http::{HttpMethod, Transport, UreqTransport};
use crate::options::{set_header, CallOptions, RequestOptions, ResourceConfig};
use crate::query::query_string;
use crate::request::{build_request, resolve_destination};
use crate::resource::Resource;
use crate::response::{check_status, parse_body, Envelope};

/// Resource backed by a blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchResource<T = UreqTransport> {
    options: RequestOptions,
    transport: T,
}

impl FetchResource<UreqTransport> {
    pub fn new(options: RequestOptions) -> Self {
        Self::with_transport(options, UreqTransport::new())
    }

    /// Build a resource from a config document. Hooks can be attached
    /// afterwards through `options_mut`.
    pub fn from_config(config: &ResourceConfig) -> Result<Self, ResourceError> {
        let transport = UreqTransport::with_timeout(config.timeout_secs.map(Duration::from_secs));
        Ok(Self::with_transport(config.to_options()?, transport))
    }
}

impl Default for FetchResource<UreqTransport> {
    fn default() -> Self {
        Self::new(RequestOptions::default())
    }
}

impl<T: Transport> FetchResource<T> {
    pub fn with_transport(options: RequestOptions, transport: T) -> Self {
        Self { options, transport }
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one request/response cycle.
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        let effective = self.options.merge(options);
        let request = build_request(method, path, body, &effective)?;

        if let Some(gate) = &self.options.gate {
            gate(&request).map_err(|e| {
                warn!("{method} {} rejected before sending: {e}", request.url);
                ResourceError::Rejected(e)
            })?;
        }

        debug!("{method} {}", request.url);
        let response = self.transport.execute(&request)?;
        let body = parse_body(&response)?;

        if !(200..300).contains(&response.status) {
            warn!("{method} {} returned {}", request.url, response.status);
            if let Some(hook) = &self.options.on_error {
                hook(&response, &body);
            }
        }
        check_status(&response, body)
    }
}

impl<T: Transport> Resource for FetchResource<T> {
    fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.send(HttpMethod::Post, path, body, options)
    }

    fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.send(HttpMethod::Put, path, body, options)
    }

    fn patch(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.send(HttpMethod::Patch, path, body, options)
    }

    fn get(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.send(HttpMethod::Get, path, body, options)
    }

    fn delete(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError> {
        self.send(HttpMethod::Delete, path, body, options)
    }

    fn set_headers(&mut self, headers: &[(&str, &str)]) {
        for (name, value) in headers {
            set_header(&mut self.options.headers, name.to_string(), value.to_string());
        }
    }

    fn clear_headers(&mut self) {
        self.options.headers.clear();
    }

    fn set_base_path(&mut self, base_path: &str) {
        self.options.base_path = Some(base_path.to_string());
    }

    fn resolve_destination(&self, segments: &[&dyn Display]) -> String {
        resolve_destination(segments, self.options.base_path.as_deref().unwrap_or_default())
    }

    fn query_string(&self, params: &Map<String, Value>) -> String {
        query_string(params, &self.options.query_options())
    }
}
