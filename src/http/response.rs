//! Turning a handled `RequestContext` into a wire response.

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::http::RequestContext;

/// Content type applied when a handler writes a body without declaring one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

impl IntoResponse for RequestContext {
    fn into_response(self) -> Response {
        let (status, mut headers, body) = self.into_response_parts();

        if !body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            );
        }

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn status_headers_and_body_carry_over() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.set_status(StatusCode::ACCEPTED);
        ctx.set_header("x-demo", "1");
        ctx.set_content_type("application/json");
        ctx.set_body("{}");

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-demo"], "1");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[test]
    fn default_content_type_only_for_non_empty_bodies() {
        let mut ctx = RequestContext::new(Method::GET, "/");
        ctx.set_body("hi");
        let response = ctx.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], DEFAULT_CONTENT_TYPE);

        let empty = RequestContext::new(Method::GET, "/").into_response();
        assert!(!empty.headers().contains_key(header::CONTENT_TYPE));
    }
}
