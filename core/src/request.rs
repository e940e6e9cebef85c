//! Request construction: URL resolution, body encoding, query assembly.

use std::fmt::Display;

use log::trace;
use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::form::FormData;
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{set_header, ContentType, Effective};
use crate::query::{encode_query, local_time_offset};

/// Join `segments` onto `base` with single slashes.
///
/// `resolve_destination(&[&"users", &5], "/api/")` is `/api/users/5`.
pub fn resolve_destination(segments: &[&dyn Display], base: &str) -> String {
    let mut out = base.to_string();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    collapse_slashes(&out)
}

/// Concatenate a base URL and a relative path, collapsing duplicate slashes.
pub fn join_url(base: &str, path: &str) -> String {
    collapse_slashes(&format!("{base}/{path}"))
}

/// Collapse runs of `/` into one, leaving a leading scheme's `://` intact.
fn collapse_slashes(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(idx) if is_scheme(&url[..idx]) => url.split_at(idx + 3),
        _ => ("", url),
    };
    let mut out = String::with_capacity(url.len());
    out.push_str(scheme);
    let mut previous_slash = false;
    for c in rest.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Build the request for one call from already-merged options.
pub fn build_request(
    method: HttpMethod,
    path: &str,
    body: Option<&Value>,
    options: &Effective,
) -> Result<HttpRequest, ResourceError> {
    let base = options
        .base_path
        .as_deref()
        .filter(|base| !base.is_empty())
        .ok_or(ResourceError::MissingBasePath)?;

    let (path, inline_query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let mut url = join_url(base, path);
    if options.trailing_slash && !url.ends_with('/') {
        url.push('/');
    }

    let mut headers = options.headers.clone();
    let mut params = options.params.clone();
    let mut payload = None;

    match (method, body) {
        (_, None) => {}
        (HttpMethod::Get, Some(Value::Object(fields))) => merge_missing(&mut params, fields),
        (HttpMethod::Get, Some(_)) => trace!("dropping non-object body on GET {url}"),
        (_, Some(body)) => payload = Some(encode_body(body, options.content_type, &mut headers)?),
    }

    let offset = options.query.time_offset.then(local_time_offset);
    let query = encode_query(&params, options.query.array_format, offset);

    if let Some(inline) = inline_query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(inline);
        if !query.is_empty() {
            url.push('&');
            url.push_str(&query);
        }
    } else if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }

    Ok(HttpRequest {
        method,
        url,
        headers,
        body: payload,
    })
}

fn merge_missing(params: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        if !params.contains_key(key) {
            params.insert(key.clone(), value.clone());
        }
    }
}

fn encode_body(
    body: &Value,
    content_type: ContentType,
    headers: &mut Vec<(String, String)>,
) -> Result<String, ResourceError> {
    match content_type {
        ContentType::Json => {
            if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                headers.push(("content-type".to_string(), "application/json".to_string()));
            }
            serde_json::to_string(body).map_err(|e| ResourceError::Serialization(e.to_string()))
        }
        ContentType::FormData => {
            let form = FormData::from_value(body)?;
            trace!("encoded {} multipart fields", form.fields().len());
            set_header(headers, "content-type".to_string(), form.content_type());
            Ok(form.encode())
        }
        ContentType::None => Ok(match body {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }),
    }
}
