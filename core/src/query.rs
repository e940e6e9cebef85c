//! URL query string encoding.
//!
//! Parameters arrive as a JSON object so any `Serialize` type can be used as
//! a parameter set. Output carries no leading `?`.

use chrono::Local;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Characters escaped in a query component. Everything except the
/// unreserved set `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Name of the parameter injected when time-offset reporting is on.
pub const TIME_OFFSET_PARAM: &str = "timeoffset";

/// How array values are laid out in the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `key[]=a&key[]=b`
    Array,
    /// `key=a,b`
    #[default]
    Comma,
}

/// Encoding switches for `query_string`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub array_format: ArrayFormat,
    /// Append `timeoffset=<minutes>` computed from the local clock.
    pub time_offset: bool,
}

/// Encode `params` as a query string.
pub fn query_string(params: &Map<String, Value>, options: &QueryOptions) -> String {
    let offset = options.time_offset.then(local_time_offset);
    encode_query(params, options.array_format, offset)
}

/// Minutes between UTC and the local time zone, UTC minus local.
///
/// A host at UTC+02:00 reports `-120`.
pub fn local_time_offset() -> i32 {
    -(Local::now().offset().local_minus_utc() / 60)
}

/// Encode `params` with an explicit time offset instead of the local clock.
pub fn encode_query(
    params: &Map<String, Value>,
    array_format: ArrayFormat,
    time_offset: Option<i32>,
) -> String {
    let mut pairs: Vec<String> = Vec::new();

    for (key, value) in params {
        let name = encode_component(key);
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .filter_map(scalar_text)
                    .map(|text| encode_component(&text))
                    .collect();
                if items.is_empty() {
                    continue;
                }
                match array_format {
                    ArrayFormat::Array => {
                        pairs.extend(items.iter().map(|item| format!("{name}[]={item}")))
                    }
                    ArrayFormat::Comma => pairs.push(format!("{name}={}", items.join(","))),
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push(format!("{name}={}", encode_component(&text)));
                }
            }
        }
    }

    if let Some(offset) = time_offset {
        pairs.push(format!("{TIME_OFFSET_PARAM}={offset}"));
    }

    pairs.join("&")
}

/// Textual form of a single parameter value; `None` for nulls.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}
