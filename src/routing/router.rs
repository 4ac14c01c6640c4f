//! HTTP route registration and dispatch.
//!
//! # Responsibilities
//! - Public registration surface (`get`, `post`, ...)
//! - Bind path parameters into the request context
//! - Invoke the matched handler, or synthesize 404 / 405 responses
//!
//! # Design Decisions
//! - The router never serializes bytes; it only fills the context's response
//! - A panicking handler becomes a 500, the worker keeps running

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};

use crate::http::RequestContext;
use crate::routing::error::RouteError;
use crate::routing::handler::Handler;
use crate::routing::pattern::PathPattern;
use crate::routing::table::{RouteMatch, RouteTable};

/// What `dispatch` did with a request. The context's response is filled in
/// for every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    NotFound,
    MethodNotAllowed(Vec<Method>),
    HandlerPanicked,
}

/// HTTP router: registration during startup, lock-free dispatch afterwards.
#[derive(Debug, Default)]
pub struct HttpRouter {
    table: RouteTable,
}

macro_rules! method_helpers {
    ($($name:ident => $method:ident;)*) => {
        $(
            #[doc = concat!("Register a `", stringify!($method), "` route.")]
            pub fn $name<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
            where
                F: Fn(&mut RequestContext) + Send + Sync + 'static,
            {
                self.route(Method::$method, pattern, handler)
            }
        )*
    };
}

impl HttpRouter {
    pub fn new() -> Self {
        Self::default()
    }

    method_helpers! {
        get => GET;
        post => POST;
        put => PUT;
        delete => DELETE;
        patch => PATCH;
        head => HEAD;
        options => OPTIONS;
    }

    /// Register a closure for an arbitrary method.
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.route_handler(method, pattern, handler)
    }

    /// Register any [`Handler`] implementor.
    pub fn route_handler<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        let compiled = PathPattern::compile(pattern)?;
        self.table.insert(method.clone(), compiled, Arc::new(handler))?;
        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        Ok(self)
    }

    /// Resolve without invoking anything.
    pub fn resolve<'a>(&'a self, method: &Method, path: &str) -> RouteMatch<'a> {
        self.table.lookup(method, path)
    }

    /// Route the request held by `ctx` and run its handler.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> DispatchOutcome {
        match self.table.lookup(ctx.method(), ctx.path()) {
            RouteMatch::Found { entry, params } => {
                ctx.bind_path_params(params);
                let handler = entry.handler();
                match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(ctx))) {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(_) => {
                        tracing::error!(
                            method = %ctx.method(),
                            path = %ctx.path(),
                            pattern = %entry.pattern(),
                            "Handler panicked"
                        );
                        ctx.reset_response();
                        ctx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                        ctx.set_content_type("text/plain");
                        ctx.set_body("Internal Server Error");
                        DispatchOutcome::HandlerPanicked
                    }
                }
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::debug!(method = %ctx.method(), path = %ctx.path(), allow = %allow, "Method not allowed");
                ctx.set_status(StatusCode::METHOD_NOT_ALLOWED);
                ctx.set_header(header::ALLOW, &allow);
                ctx.set_content_type("text/plain");
                ctx.set_body("Method Not Allowed");
                DispatchOutcome::MethodNotAllowed(allowed)
            }
            RouteMatch::NotFound => {
                tracing::debug!(method = %ctx.method(), path = %ctx.path(), "No route matched");
                ctx.set_status(StatusCode::NOT_FOUND);
                ctx.set_content_type("text/plain");
                ctx.set_body("Not Found");
                DispatchOutcome::NotFound
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_runs_handler_with_params() {
        let mut router = HttpRouter::new();
        router
            .get("/users/:id", |ctx: &mut RequestContext| {
                let id = ctx.get_path_param("id").unwrap_or("unknown").to_string();
                ctx.set_body(format!("Fetching user with ID: {id}"));
            })
            .unwrap();

        let mut ctx = RequestContext::new(Method::GET, "/users/123");
        assert_eq!(router.dispatch(&mut ctx), DispatchOutcome::Handled);
        assert_eq!(ctx.status(), StatusCode::OK);
        assert_eq!(ctx.response_body(), "Fetching user with ID: 123".as_bytes());
    }

    #[test]
    fn registration_chains_and_rejects_duplicates() {
        let mut router = HttpRouter::new();
        router
            .get("/a", |_: &mut RequestContext| {})
            .unwrap()
            .post("/a", |_: &mut RequestContext| {})
            .unwrap();
        assert_eq!(router.len(), 2);

        let err = router.get("/a", |_: &mut RequestContext| {}).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));

        let err = router.get("no-slash", |_: &mut RequestContext| {}).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern(_)));
    }

    #[test]
    fn wrong_method_sets_allow_header() {
        let mut router = HttpRouter::new();
        router.post("/api/json", |_: &mut RequestContext| {}).unwrap();
        router.put("/api/json", |_: &mut RequestContext| {}).unwrap();

        let mut ctx = RequestContext::new(Method::GET, "/api/json");
        let outcome = router.dispatch(&mut ctx);

        assert_eq!(
            outcome,
            DispatchOutcome::MethodNotAllowed(vec![Method::POST, Method::PUT])
        );
        assert_eq!(ctx.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            ctx.response_headers().get(header::ALLOW).unwrap(),
            "POST, PUT"
        );
    }

    #[test]
    fn unknown_path_is_404() {
        let router = HttpRouter::new();
        let mut ctx = RequestContext::new(Method::GET, "/nonexistent");
        assert_eq!(router.dispatch(&mut ctx), DispatchOutcome::NotFound);
        assert_eq!(ctx.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn panicking_handler_becomes_500() {
        let mut router = HttpRouter::new();
        router
            .get("/boom", |ctx: &mut RequestContext| {
                ctx.set_body("partial");
                panic!("handler failure");
            })
            .unwrap();

        let mut ctx = RequestContext::new(Method::GET, "/boom");
        assert_eq!(router.dispatch(&mut ctx), DispatchOutcome::HandlerPanicked);
        assert_eq!(ctx.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ctx.response_body(), "Internal Server Error".as_bytes());
    }
}
