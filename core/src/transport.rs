//! Executes `HttpRequest` descriptors over the network.
//!
//! `Transport` is the seam between request building and I/O. The bundled
//! `ReqwestTransport` uses a blocking reqwest client; tests substitute their
//! own implementation to capture requests and script responses.

use std::fs::File;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::COOKIE;
use reqwest::Method;

use crate::error::{RestError, Result};
use crate::http::{cookie_header, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Sends one request and returns the raw response, whatever its status.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Blocking reqwest transport. Requests have no timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| RestError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Content type for an uploaded part, guessed from its client file name.
fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename).first_or_octet_stream().to_string()
}

/// Builds the multipart form, opening each attachment now so the handle lives
/// only as long as the request.
fn multipart_form(fields: &[(String, String)], files: &[crate::http::FileAttachment]) -> Result<Form> {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key.clone(), value.clone());
    }
    for file in files {
        let handle = File::open(&file.path).map_err(|source| RestError::FileUnreadable {
            key: file.key.clone(),
            source,
        })?;
        let part = Part::reader(handle)
            .file_name(file.filename.clone())
            .mime_str(&content_type_for(&file.filename))
            .map_err(|e| RestError::Transport(e.to_string()))?;
        form = form.part(file.key.clone(), part);
    }
    Ok(form)
}

fn with_body(builder: RequestBuilder, body: &RequestBody) -> Result<RequestBuilder> {
    Ok(match body {
        RequestBody::Query(pairs) if pairs.is_empty() => builder,
        RequestBody::Query(pairs) => builder.query(pairs),
        RequestBody::Json(value) => builder.json(value),
        RequestBody::Multipart { fields, files } => builder.multipart(multipart_form(fields, files)?),
    })
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookies) = cookie_header(&request.cookies) {
            builder = builder.header(COOKIE, cookies);
        }
        builder = with_body(builder, &request.body)?;

        tracing::trace!(method = %request.method, url = %request.url, "sending request");
        let response = builder.send().map_err(|e| RestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().map_err(|e| RestError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}
