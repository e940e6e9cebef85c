//! Response normalization.
//!
//! A raw `HttpResponse` becomes an `Envelope`: parsed JSON when the server
//! says the body is JSON, the raw text otherwise. Object bodies gain a
//! `_status` field holding the HTTP status; every other shape is returned
//! untouched, so callers must not rely on `_status` for arrays or text.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ResourceError;
use crate::http::HttpResponse;

/// Field injected into object bodies.
pub const STATUS_FIELD: &str = "_status";

/// Normalized response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Json(Value),
    Text(String),
}

impl Envelope {
    /// The injected status code. `None` for anything but object bodies.
    pub fn status(&self) -> Option<u16> {
        match self {
            Envelope::Json(Value::Object(map)) => map
                .get(STATUS_FIELD)
                .and_then(Value::as_u64)
                .and_then(|status| u16::try_from(status).ok()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Envelope::Json(value) => Some(value),
            Envelope::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Envelope::Text(text) => Some(text),
            Envelope::Json(_) => None,
        }
    }

    /// Body as JSON with the injected status removed. Text bodies become
    /// JSON strings.
    pub fn into_value(self) -> Value {
        match self {
            Envelope::Json(Value::Object(mut map)) => {
                map.remove(STATUS_FIELD);
                Value::Object(map)
            }
            Envelope::Json(value) => value,
            Envelope::Text(text) => Value::String(text),
        }
    }

    /// Deserialize the body into `T`, ignoring the injected status.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, ResourceError> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Envelope::Json(value) => write!(f, "{value}"),
            Envelope::Text(text) => f.write_str(text),
        }
    }
}

/// Parse a response body into an `Envelope`, attaching the status to
/// object bodies.
pub fn parse_body(response: &HttpResponse) -> Result<Envelope, ResourceError> {
    if response.body.is_empty() || !is_json(response.header("content-type")) {
        return Ok(Envelope::Text(response.body.clone()));
    }
    let mut value: Value = serde_json::from_str(&response.body)?;
    if let Value::Object(map) = &mut value {
        map.insert(STATUS_FIELD.to_string(), Value::from(response.status));
    }
    Ok(Envelope::Json(value))
}

/// Split a response into success and failure by status.
///
/// Returns the parsed body for 200..=299 and `ResourceError::Http` carrying
/// the parsed body otherwise.
pub fn check_status(response: &HttpResponse, body: Envelope) -> Result<Envelope, ResourceError> {
    if (200..300).contains(&response.status) {
        return Ok(body);
    }
    Err(ResourceError::Http {
        status: response.status,
        body,
    })
}

fn is_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
