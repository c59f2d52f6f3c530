//! End-to-end REST calls against a sibling service.
//!
//! # Design
//! A call runs through three steps:
//!
//! 1. `build_request` resolves the URL, flattens the parameters, scans the
//!    top level for files and picks the body shape. It returns plain data and
//!    performs no I/O.
//! 2. The `Transport` executes the request.
//! 3. `normalize_response` turns the raw response into the decoded JSON body
//!    or a `RestError`.
//!
//! Body shape: a call carrying at least one valid top-level file is sent as
//! multipart with the *flattened* fields; otherwise non-GET calls send the
//! caller's tree unflattened as JSON and GET calls send the flattened
//! parameters as the query string. Files nested below the top level are
//! never attached.

use serde_json::Value;

use crate::error::{status_or_fallback, RestError, Result};
use crate::http::{Cookie, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::params::{flatten, nested_file_paths, scan_files, ParamTree};
use crate::service::RestService;
use crate::transport::{ReqwestTransport, Transport};
use crate::url::UrlResolver;

/// Headers every request carries before caller-supplied ones.
pub const DEFAULT_HEADERS: [(&str, &str); 2] = [("Accept", "application/json"), ("SERVER_PROTOCOL", "HTTP/1.1")];

/// Calls one sibling service.
///
/// Holds no per-call state. Headers and cookies added through
/// [`RequestDispatcher::header`] and [`RequestDispatcher::cookie`] apply to
/// every later call.
#[derive(Debug)]
pub struct RequestDispatcher<S, T = ReqwestTransport> {
    resolver: UrlResolver,
    service: S,
    transport: T,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie>,
}

impl<S: RestService> RequestDispatcher<S, ReqwestTransport> {
    pub fn new(resolver: UrlResolver, service: S) -> Result<Self> {
        Ok(Self::with_transport(resolver, service, ReqwestTransport::new()?))
    }
}

impl<S: RestService, T: Transport> RequestDispatcher<S, T> {
    pub fn with_transport(resolver: UrlResolver, service: S, transport: T) -> Self {
        Self {
            resolver,
            service,
            transport,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// Adds a header, replacing any earlier value with the same name.
    ///
    /// A `Cookie` header is split into cookies instead, so the request still
    /// carries a single `Cookie` header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value: String = value.into();
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies.extend(parse_cookie_header(&value));
            return self;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));
        self
    }

    pub fn cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls `uri` with a verb given as text, e.g. `"post"`.
    pub fn rest(&self, verb: &str, uri: &str, params: &ParamTree) -> Result<Value> {
        let method: HttpMethod = verb.parse()?;
        self.send(method, uri, params)
    }

    pub fn send(&self, method: HttpMethod, uri: &str, params: &ParamTree) -> Result<Value> {
        let request = self.build_request(method, uri, params)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            multipart = request.body.is_multipart(),
            "dispatching request"
        );
        let response = self.transport.send(&request)?;
        self.parse_response(response)
    }

    pub fn get(&self, uri: &str, params: &ParamTree) -> Result<Value> {
        self.send(HttpMethod::Get, uri, params)
    }

    pub fn post(&self, uri: &str, params: &ParamTree) -> Result<Value> {
        self.send(HttpMethod::Post, uri, params)
    }

    pub fn put(&self, uri: &str, params: &ParamTree) -> Result<Value> {
        self.send(HttpMethod::Put, uri, params)
    }

    pub fn patch(&self, uri: &str, params: &ParamTree) -> Result<Value> {
        self.send(HttpMethod::Patch, uri, params)
    }

    pub fn delete(&self, uri: &str, params: &ParamTree) -> Result<Value> {
        self.send(HttpMethod::Delete, uri, params)
    }

    pub fn build_request(&self, method: HttpMethod, uri: &str, params: &ParamTree) -> Result<HttpRequest> {
        let url = self.resolver.url_for(&self.service, uri)?;

        let files = scan_files(params);
        for path in nested_file_paths(params) {
            tracing::warn!(param = %path, "nested file parameter is not attached");
        }

        let body = if !files.is_empty() {
            RequestBody::Multipart {
                fields: flatten(params).to_form_pairs(),
                files,
            }
        } else if method == HttpMethod::Get {
            RequestBody::Query(flatten(params).to_form_pairs())
        } else {
            RequestBody::Json(params.to_json())
        };

        let mut headers: Vec<(String, String)> = DEFAULT_HEADERS
            .iter()
            .filter(|(k, _)| !self.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(k)))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.extend(self.headers.iter().cloned());

        Ok(HttpRequest {
            method,
            url,
            headers,
            cookies: self.cookies.clone(),
            body,
        })
    }

    pub fn parse_response(&self, response: HttpResponse) -> Result<Value> {
        normalize_response(response)
    }
}

fn parse_cookie_header(value: &str) -> Vec<Cookie> {
    value
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| Cookie::new(name, value.trim()))
        })
        .collect()
}

/// Decoded body for 2xx responses, `RestError` otherwise.
///
/// An empty success body decodes to `null`.
pub fn normalize_response(response: HttpResponse) -> Result<Value> {
    if response.is_success() {
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&response.body).map_err(|e| RestError::Deserialization(e.to_string()));
    }

    let code = status_or_fallback(response.status);
    let err = match serde_json::from_str::<Value>(&response.body) {
        Ok(body) => match body.get("message").and_then(Value::as_str) {
            Some(message) => RestError::Upstream {
                message: message.to_string(),
                code,
            },
            None => RestError::MalformedUpstream {
                code,
                body: response.body,
                reason: "missing string `message` field".to_string(),
            },
        },
        Err(e) => RestError::MalformedUpstream {
            code,
            body: response.body,
            reason: e.to_string(),
        },
    };
    tracing::warn!(status = response.status, error = %err, "upstream call failed");
    Err(err)
}
