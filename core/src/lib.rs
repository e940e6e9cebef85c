//! Blocking REST resource client.
//!
//! # Overview
//! Wraps a plain HTTP client in a small resource abstraction: request
//! defaults (headers, base path, body encoding, query layout) are stored once
//! per resource, every call merges its own options over them, and responses
//! come back as a normalized `Envelope`. A repository layer maps collection
//! endpoints onto typed entities.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`).
//!   Building and parsing are pure; a `Transport` performs the I/O, so the
//!   whole pipeline is testable without a network.
//! - `Resource` is the capability set; `FetchResource` implements it over any
//!   `Transport`, defaulting to `ureq`.
//! - Listing entities is a separate trait (`EntityResource`) so concrete
//!   resources have to provide it rather than inherit a failing stub.
//!
//! ```no_run
//! use rest_resource::{CallOptions, FetchResource, RequestOptions, Resource};
//!
//! let resource = FetchResource::new(RequestOptions::new("https://api.example.com/v1"));
//! let user = resource.get("users/5", None, Some(&CallOptions::new().param("expand", "roles")))?;
//! println!("status {:?}: {user}", user.status());
//! # Ok::<(), rest_resource::ResourceError>(())
//! ```

pub mod error;
pub mod fetch;
pub mod form;
pub mod http;
pub mod options;
pub mod query;
pub mod repository;
pub mod request;
pub mod resource;
pub mod response;

pub use error::{BoxError, ResourceError};
pub use fetch::FetchResource;
pub use form::FormData;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use options::{CallOptions, ContentType, ErrorHook, GateHook, RequestOptions, ResourceConfig};
pub use query::{encode_query, query_string, ArrayFormat, QueryOptions};
pub use repository::{repository, EntityMapper, KeyMap, Repository, RepositoryBuilder};
pub use request::resolve_destination;
pub use resource::{EntityResource, Resource};
pub use response::{Envelope, STATUS_FIELD};
