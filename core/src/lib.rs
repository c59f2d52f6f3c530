//! Request helper for calling sibling internal REST services.
//!
//! # Overview
//! `RequestDispatcher::rest(verb, uri, params)` resolves
//! `host/prefix/version/path_prefix[/uri]`, flattens nested parameters into
//! bracketed key paths, attaches top-level file parameters as multipart
//! parts, sends the call and returns the decoded JSON body or a `RestError`
//! carrying the upstream message and status code.
//!
//! # Design
//! - Configuration is injected into `UrlResolver` through `ConfigSource`; no
//!   process-wide state.
//! - Each service declares its config key, path prefix and optional default
//!   host through `RestService`.
//! - Request building and response normalization are pure functions over
//!   plain data (`HttpRequest`, `HttpResponse`); only `Transport` does I/O.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod params;
pub mod service;
pub mod transport;
pub mod url;

pub use config::{ApiConfig, ConfigSource};
pub use dispatcher::{normalize_response, RequestDispatcher};
pub use error::{RestError, Result};
pub use http::{Cookie, FileAttachment, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use params::{flatten, flatten_entries, scan_files, FileParam, FlatParams, ParamTree, ParamValue, Scalar};
pub use service::{RestService, ServiceDescriptor};
pub use transport::{ReqwestTransport, Transport};
pub use url::{build_url, UrlResolver};
