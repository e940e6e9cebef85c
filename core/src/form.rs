//! `multipart/form-data` body encoding.
//!
//! Nested objects are flattened into bracketed field names (`user[name]`,
//! `tags[]`). Dates reach this module already rendered as RFC 3339 strings by
//! serde, so they are handled as ordinary string leaves.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ResourceError;

/// RFC 5987 `attr-char` complement, used for non-ASCII field names.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Flattened form fields plus the boundary used to render them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormData {
    boundary: String,
    fields: Vec<(String, String)>,
}

impl FormData {
    /// Flatten a JSON object into form fields.
    ///
    /// Fails if `value` is not an object: a multipart body needs named fields.
    pub fn from_value(value: &Value) -> Result<Self, ResourceError> {
        let map = value.as_object().ok_or_else(|| {
            ResourceError::Serialization("multipart body must be a JSON object".to_string())
        })?;
        Ok(Self::from_map(map))
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        let mut fields = Vec::new();
        for (key, value) in map {
            flatten_into(&mut fields, key.clone(), value);
        }
        Self {
            boundary: gen_boundary(),
            fields,
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the `Content-Type` header announcing this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Render the complete request body.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str("--");
            out.push_str(&self.boundary);
            out.push_str("\r\n");
            out.push_str(&disposition(name));
            out.push_str("\r\n\r\n");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("--");
        out.push_str(&self.boundary);
        out.push_str("--\r\n");
        out
    }
}

fn flatten_into(fields: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => {}
        Value::Bool(true) => fields.push((key, "true".to_string())),
        Value::Number(n) => {
            if n.as_f64() != Some(0.0) {
                fields.push((key, n.to_string()));
            }
        }
        Value::String(s) => {
            if !s.is_empty() {
                fields.push((key, s.clone()));
            }
        }
        Value::Array(items) => {
            let item_key = format!("{key}[]");
            for item in items {
                flatten_into(fields, item_key.clone(), item);
            }
        }
        Value::Object(map) => {
            for (child, child_value) in map {
                flatten_into(fields, format!("{key}[{child}]"), child_value);
            }
        }
    }
}

fn disposition(name: &str) -> String {
    match percent_encode_name(name) {
        Cow::Borrowed(name) => {
            format!("Content-Disposition: form-data; name=\"{name}\"")
        }
        Cow::Owned(encoded) => {
            format!("Content-Disposition: form-data; name*=utf-8''{encoded}")
        }
    }
}

fn percent_encode_name(name: &str) -> Cow<'_, str> {
    // brackets and quotes in ASCII names are legal inside the quoted form
    if name.is_ascii() && !name.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(name);
    }
    utf8_percent_encode(name, ATTR_CHAR).into()
}

fn gen_boundary() -> String {
    format!("----form-{}", Uuid::new_v4().simple())
}
