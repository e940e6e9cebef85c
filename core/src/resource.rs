//! The capability set every resource exposes.
//!
//! # Design
//! Verbs and configuration live on `Resource`; bulk entity retrieval lives on
//! `EntityResource` with no default body, so a concrete resource that wants
//! to be listed must say how. The compiler enforces the override instead of a
//! runtime "not implemented" failure.

use std::fmt::Display;

use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::options::CallOptions;
use crate::response::Envelope;

/// CRUD verbs against a configured base path.
pub trait Resource {
    fn post(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError>;

    fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError>;

    fn patch(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError>;

    /// An object `body` is sent as query parameters.
    fn get(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError>;

    fn delete(
        &self,
        path: &str,
        body: Option<&Value>,
        options: Option<&CallOptions>,
    ) -> Result<Envelope, ResourceError>;

    /// Merge `headers` into the stored defaults, replacing same-named ones.
    fn set_headers(&mut self, headers: &[(&str, &str)]);

    fn clear_headers(&mut self);

    fn set_base_path(&mut self, base_path: &str);

    /// Join `segments` onto the configured base path.
    fn resolve_destination(&self, segments: &[&dyn Display]) -> String;

    /// Encode `params` with the stored query options.
    fn query_string(&self, params: &Map<String, Value>) -> String;
}

/// A resource that knows how to list its own entities.
pub trait EntityResource: Resource {
    type Entity;

    fn get_all_entities(
        &self,
        options: Option<&CallOptions>,
    ) -> Result<Vec<Self::Entity>, ResourceError>;
}
