use std::sync::Arc;

use crate::controller::Controller;
use crate::demo::{log_error, reply_with_prefix, ECHO_ENDPOINT_HTML};
use crate::http::RequestContext;
use crate::routing::{HttpRouter, RouteError};
use crate::websocket::{WebsocketContext, WebsocketHandler, WebsocketRouter};

/// `GET /api/hello`: greets the `name` query parameter.
#[derive(Debug, Default)]
pub struct HelloController;

impl HelloController {
    fn handle_hello(&self, ctx: &mut RequestContext) {
        let name = ctx.get_query_param("name").unwrap_or("Guest");
        let body = format!("Hello, {name}!");
        ctx.set_content_type("text/plain");
        ctx.set_body(body);
    }
}

impl Controller for HelloController {
    fn register_routes(self: Arc<Self>, router: &mut HttpRouter) -> Result<Arc<Self>, RouteError> {
        let this = Arc::clone(&self);
        router.get("/api/hello", move |ctx: &mut RequestContext| this.handle_hello(ctx))?;
        Ok(self)
    }
}

/// Echo service on `/hellows`, registered for both protocols.
#[derive(Debug, Default)]
pub struct HelloWsController;

impl Controller for HelloWsController {
    fn register_routes(self: Arc<Self>, router: &mut HttpRouter) -> Result<Arc<Self>, RouteError> {
        router.get("/hellows", |ctx: &mut RequestContext| {
            ctx.set_status(axum::http::StatusCode::UPGRADE_REQUIRED);
            ctx.set_header(axum::http::header::UPGRADE, "websocket");
            ctx.set_content_type("text/html");
            ctx.set_body(ECHO_ENDPOINT_HTML);
        })?;
        Ok(self)
    }

    fn register_ws_routes(self: Arc<Self>, router: &mut WebsocketRouter) -> Result<Arc<Self>, RouteError> {
        router.add("/hellows", Arc::clone(&self))?;
        Ok(self)
    }
}

impl WebsocketHandler for HelloWsController {
    fn on_open(&self, ctx: &mut WebsocketContext) {
        tracing::info!(path = %ctx.path(), "Connection opened");
        ctx.send_text("Welcome to the echo service!");
    }

    fn on_message(&self, ctx: &mut WebsocketContext) {
        reply_with_prefix(ctx, "Echo: ");
    }

    fn on_close(&self, ctx: &mut WebsocketContext) {
        tracing::info!(path = %ctx.path(), "Connection closed");
    }

    fn on_error(&self, ctx: &mut WebsocketContext) {
        log_error(ctx);
    }
}
