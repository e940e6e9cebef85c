//! Stored request defaults, per-call overrides, and the config file shape.
//!
//! # Design
//! `RequestOptions` is the mutable default set owned by a resource.
//! `CallOptions` mirrors it with every field optional; `RequestOptions::merge`
//! lays a call's options over the defaults and yields the `Effective` set the
//! request builder works from. Hooks are plain `Arc`ed closures so options
//! stay cheaply cloneable; they are attached in code, never from config.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{BoxError, ResourceError};
use crate::http::{HttpRequest, HttpResponse};
use crate::query::{ArrayFormat, QueryOptions};
use crate::response::Envelope;

/// Pre-flight check consulted with the fully built request. Returning `Err`
/// vetoes the call and the error is handed back to the caller.
pub type GateHook = Arc<dyn Fn(&HttpRequest) -> Result<(), BoxError> + Send + Sync>;

/// Observer invoked once for every non-success response, before the call fails.
pub type ErrorHook = Arc<dyn Fn(&HttpResponse, &Envelope) + Send + Sync>;

/// How request bodies are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[default]
    Json,
    FormData,
    /// Send the body as-is without announcing a content type.
    None,
}

/// Default options stored on a resource.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub base_path: Option<String>,
    pub headers: Vec<(String, String)>,
    pub content_type: ContentType,
    pub trailing_slash: bool,
    pub array_format: ArrayFormat,
    pub time_offset: bool,
    pub gate: Option<GateHook>,
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("base_path", &self.base_path)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("trailing_slash", &self.trailing_slash)
            .field("array_format", &self.array_format)
            .field("time_offset", &self.time_offset)
            .field("gate", &self.gate.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl RequestOptions {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_trailing_slash(mut self, on: bool) -> Self {
        self.trailing_slash = on;
        self
    }

    pub fn with_array_format(mut self, format: ArrayFormat) -> Self {
        self.array_format = format;
        self
    }

    pub fn with_time_offset(mut self, on: bool) -> Self {
        self.time_offset = on;
        self
    }

    pub fn with_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.gate = Some(Arc::new(gate));
        self
    }

    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HttpResponse, &Envelope) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            array_format: self.array_format,
            time_offset: self.time_offset,
        }
    }

    /// Lay `call` over these defaults. Any field set on `call` wins; call
    /// headers replace same-named defaults and the rest are kept.
    pub fn merge(&self, call: Option<&CallOptions>) -> Effective {
        let mut merged = Effective {
            base_path: self.base_path.clone(),
            headers: self.headers.clone(),
            content_type: self.content_type,
            trailing_slash: self.trailing_slash,
            query: QueryOptions {
                array_format: self.array_format,
                time_offset: self.time_offset,
            },
            params: Map::new(),
        };
        let Some(call) = call else {
            return merged;
        };

        if let Some(base_path) = &call.base_path {
            merged.base_path = Some(base_path.clone());
        }
        for (name, value) in &call.headers {
            set_header(&mut merged.headers, name.clone(), value.clone());
        }
        if let Some(content_type) = call.content_type {
            merged.content_type = content_type;
        }
        if let Some(trailing_slash) = call.trailing_slash {
            merged.trailing_slash = trailing_slash;
        }
        if let Some(array_format) = call.array_format {
            merged.query.array_format = array_format;
        }
        if let Some(time_offset) = call.time_offset {
            merged.query.time_offset = time_offset;
        }
        merged.params = call.params.clone();
        merged
    }
}

/// Options for a single call. Unset fields fall back to the resource defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub base_path: Option<String>,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<ContentType>,
    pub trailing_slash: Option<bool>,
    pub array_format: Option<ArrayFormat>,
    pub time_offset: Option<bool>,
    /// Query parameters for this call.
    pub params: Map<String, Value>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn trailing_slash(mut self, on: bool) -> Self {
        self.trailing_slash = Some(on);
        self
    }

    pub fn array_format(mut self, format: ArrayFormat) -> Self {
        self.array_format = Some(format);
        self
    }

    pub fn time_offset(mut self, on: bool) -> Self {
        self.time_offset = Some(on);
        self
    }
}

/// Options in force for one request after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Effective {
    pub base_path: Option<String>,
    pub headers: Vec<(String, String)>,
    pub content_type: ContentType,
    pub trailing_slash: bool,
    pub query: QueryOptions,
    pub params: Map<String, Value>,
}

/// Insert or replace a header, matching names case-insensitively.
pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
        Some(slot) => *slot = (name, value),
        None => headers.push((name, value)),
    }
}

/// Resource configuration as read from a JSON document.
///
/// ```json
/// {
///   "base_path": "https://api.example.com/v1",
///   "headers": { "accept": "application/json" },
///   "content_type": "form-data",
///   "trailing_slash": true,
///   "array_format": "array",
///   "time_offset": false,
///   "timeout_secs": 30
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub base_path: Option<String>,
    pub headers: Map<String, Value>,
    pub content_type: ContentType,
    pub trailing_slash: bool,
    pub array_format: ArrayFormat,
    pub time_offset: bool,
    pub timeout_secs: Option<u64>,
}

impl ResourceConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(raw).map_err(|e| ResourceError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ResourceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Convert into stored defaults. Header values must be strings.
    pub fn to_options(&self) -> Result<RequestOptions, ResourceError> {
        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let value = value.as_str().ok_or_else(|| {
                ResourceError::Config(format!("header `{name}` must be a string"))
            })?;
            set_header(&mut headers, name.clone(), value.to_string());
        }
        Ok(RequestOptions {
            base_path: self.base_path.clone(),
            headers,
            content_type: self.content_type,
            trailing_slash: self.trailing_slash,
            array_format: self.array_format,
            time_offset: self.time_offset,
            gate: None,
            on_error: None,
        })
    }
}
