//! Fallback file serving from an optional web root.
//!
//! Only `GET`/`HEAD` requests that matched no route reach this layer; a
//! missing file leaves the router's own 404 in place.

use std::path::Path;

use axum::body::Body;
use axum::http::{request::Parts, Method, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeDir;

#[derive(Debug, Clone)]
pub struct StaticFiles {
    service: ServeDir,
}

impl StaticFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            service: ServeDir::new(root),
        }
    }

    /// Serve the file addressed by the request, `None` when there is none.
    pub async fn serve(&self, parts: &Parts) -> Option<Response> {
        if parts.method != Method::GET && parts.method != Method::HEAD {
            return None;
        }

        let mut request = Request::new(Body::empty());
        *request.method_mut() = parts.method.clone();
        *request.uri_mut() = parts.uri.clone();
        *request.headers_mut() = parts.headers.clone();

        let response = match self.service.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() == StatusCode::NOT_FOUND {
            return None;
        }

        tracing::debug!(path = %parts.uri.path(), status = %response.status(), "Served static file");
        Some(response.map(Body::new))
    }
}
