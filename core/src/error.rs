//! Error types for resource operations.
//!
//! # Design
//! Non-success HTTP statuses are not wrapped in a separate error payload: the
//! `Http` variant carries the parsed response body exactly as a successful
//! call would have returned it, so callers can read server-supplied error
//! details with the same `Envelope` accessors. Transport and decode failures
//! keep the underlying error as their `source()`.

use thiserror::Error;

use crate::response::Envelope;

/// Boxed error used for caller-supplied and transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `Resource` operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A request was attempted before `set_base_path` configured a base URL.
    #[error("no base path configured; call set_base_path first")]
    MissingBasePath,

    /// The configuration could not be read or contained an invalid value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The pre-flight gating hook declined to send the request.
    #[error("request rejected by gate: {0}")]
    Rejected(#[source] BoxError),

    /// The server answered with a status outside 200..=299.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: Envelope },

    /// The request could not be delivered or the response could not be read.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// A response advertised as JSON did not parse, or an envelope could not
    /// be mapped into the requested entity type.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request body could not be encoded under the active content type.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ResourceError {
    /// Status code of an HTTP failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResourceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed response body of an HTTP failure, if this is one.
    pub fn body(&self) -> Option<&Envelope> {
        match self {
            ResourceError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
