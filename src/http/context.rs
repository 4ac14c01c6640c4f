//! Per-request state shared between the dispatcher and a handler.
//!
//! # Responsibilities
//! - Expose method, path, query, path parameters and headers
//! - Interpret the buffered body as JSON, urlencoded form or multipart, lazily
//! - Collect the response a handler builds (status, headers, body)
//!
//! # Design Decisions
//! - Every body view is parsed at most once and cached for the rest of the request
//! - Accessors never fail: a body that does not fit its content type reads as absent
//! - The context is owned by one request and is never shared across tasks

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::http::body::{self, FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::http::multipart::{MultipartForm, UploadedFile};
use crate::http::request::X_REQUEST_ID;
use crate::routing::PathParams;

/// Request view plus the response under construction.
pub struct RequestContext {
    method: Method,
    path: String,
    query_string: String,
    query: HashMap<String, String>,
    path_params: PathParams,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    request_id: Option<String>,

    json: OnceCell<Option<serde_json::Value>>,
    form: OnceCell<HashMap<String, String>>,
    multipart: OnceCell<MultipartForm>,

    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Bytes,
}

impl RequestContext {
    /// Build a context for `method` and a request target such as `/hello?name=World`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        Self {
            method,
            path: path.to_string(),
            query_string: query_string.to_string(),
            query: body::parse_urlencoded(query_string.as_bytes()),
            path_params: PathParams::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            request_id: None,
            json: OnceCell::new(),
            form: OnceCell::new(),
            multipart: OnceCell::new(),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Bytes::new(),
        }
    }

    /// Build a context from the head of an incoming request and its buffered body.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut ctx = Self::new(parts.method.clone(), target)
            .with_headers(parts.headers.clone())
            .with_body(body);
        ctx.remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        ctx
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
                self.sync_request_id();
            }
            Err(_) => tracing::debug!(header = %name, "Skipping invalid request header value"),
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self.sync_request_id();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    fn sync_request_id(&mut self) {
        self.request_id = self
            .headers
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }

    pub(crate) fn bind_path_params(&mut self, params: PathParams) {
        self.path_params = params;
    }

    // --- request view ---

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// A decoded query parameter; the last value wins for repeated keys.
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A parameter bound by the matched route pattern.
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// A request header by case-insensitive name. Non-UTF-8 values read as absent.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The request's `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header(header::CONTENT_TYPE.as_str())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn content_essence(&self) -> String {
        self.content_type()
            .map(body::mime_essence)
            .unwrap_or_default()
    }

    /// The body as JSON, present only for `application/json` bodies that parse.
    pub fn get_json(&self) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| {
                if self.content_essence() != body::APPLICATION_JSON {
                    return None;
                }
                body::parse_json(&self.body)
            })
            .as_ref()
    }

    /// A field of an `application/x-www-form-urlencoded` body.
    pub fn get_form_param(&self, name: &str) -> Option<&str> {
        self.form_params().get(name).map(String::as_str)
    }

    pub fn form_params(&self) -> &HashMap<String, String> {
        self.form.get_or_init(|| {
            if self.content_essence() != FORM_URLENCODED {
                return HashMap::new();
            }
            body::parse_urlencoded(&self.body)
        })
    }

    /// A plain field of a `multipart/form-data` body.
    pub fn get_multipart_field(&self, name: &str) -> Option<&str> {
        self.multipart().field(name)
    }

    /// Files uploaded under `name`, in body order.
    ///
    /// `None` when the body has no file field called `name`; an empty slice
    /// when the field was sent without a file.
    pub fn get_uploaded_files(&self, name: &str) -> Option<&[UploadedFile]> {
        self.multipart().files(name)
    }

    fn multipart(&self) -> &MultipartForm {
        self.multipart.get_or_init(|| {
            let Some(content_type) = self.content_type() else {
                return MultipartForm::default();
            };
            if body::mime_essence(content_type) != MULTIPART_FORM_DATA {
                return MultipartForm::default();
            }
            let Some(boundary) = body::header_param(content_type, "boundary") else {
                tracing::debug!(path = %self.path, "Multipart body without boundary");
                return MultipartForm::default();
            };
            match MultipartForm::parse(&self.body, &boundary) {
                Ok(form) => form,
                Err(err) => {
                    tracing::debug!(path = %self.path, error = %err, "Malformed multipart body");
                    MultipartForm::default()
                }
            }
        })
    }

    // --- response ---

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set a response header, replacing any previous value. Invalid names or
    /// values are logged and skipped.
    pub fn set_header<K, V>(&mut self, name: K, value: V)
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: AsRef<str>,
    {
        let name = match name.try_into() {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(path = %self.path, error = %err, "Invalid response header name");
                return;
            }
        };
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.response_headers.insert(name, value);
            }
            Err(err) => {
                tracing::warn!(path = %self.path, header = %name, error = %err, "Invalid response header value");
            }
        }
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header(header::CONTENT_TYPE, content_type);
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.response_body = body.into();
    }

    /// Drop everything a handler wrote so far.
    pub fn reset_response(&mut self) {
        self.status = StatusCode::OK;
        self.response_headers.clear();
        self.response_body = Bytes::new();
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    pub fn response_content_type(&self) -> Option<&str> {
        self.response_headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub(crate) fn into_response_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.response_headers, self.response_body)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("path_params", &self.path_params)
            .field("body_len", &self.body.len())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
