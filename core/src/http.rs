//! HTTP request and response descriptors.
//!
//! # Design
//! Requests and responses are described as plain data. `RequestDispatcher`
//! builds an `HttpRequest` without touching the network and a `Transport`
//! turns it into real I/O, so the request shape can be asserted directly in
//! tests. File attachments are carried as paths; the transport opens them
//! right before the request goes out.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RestError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RestError;

    /// Verbs are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(RestError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// A cookie sent along with every request of a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Renders cookies as the value of a single `Cookie` header.
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    let pairs: Vec<String> = cookies.iter().map(|c| format!("{}={}", c.name, c.value)).collect();
    Some(pairs.join("; "))
}

/// A top-level file parameter scheduled for multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Parameter key the file was passed under.
    pub key: String,
    /// Client-facing file name sent in the part's `Content-Disposition`.
    pub filename: String,
    pub path: PathBuf,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// GET without files: flattened key paths as query parameters.
    Query(Vec<(String, String)>),
    /// Non-GET without files: the caller's parameter tree as given.
    Json(serde_json::Value),
    /// Any verb with at least one top-level file: flattened fields plus files.
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FileAttachment>,
    },
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart { .. })
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestDispatcher::build_request`; executed by a `Transport`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
