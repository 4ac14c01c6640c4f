//! The demo application served by the `khttpd` binary.
//!
//! Inline routes exercise every request-context feature (query, path
//! parameters, JSON, forms, multipart); the controllers in `controllers.rs`
//! show grouped registration.

mod controllers;

use std::sync::Arc;

use axum::http::{header, StatusCode};

use crate::http::{RequestContext, Server};
use crate::routing::{HttpRouter, RouteError};
use crate::websocket::{WebsocketContext, WebsocketRouter};

pub use controllers::{HelloController, HelloWsController};

const INDEX_HTML: &str = r#"<h1>Hello from khttpd!</h1><p>Try <a href="/hello?name=World">/hello?name=World</a> or <a href="/info">/info</a></p><p>Dynamic paths: <a href="/users/123">/users/123</a>, <a href="/users/profile">/users/profile</a>, <a href="/items/book/id/456">/items/book/id/456</a>, <a href="/files/a/b/c.txt">/files/a/b/c.txt</a></p><p>POST examples: /api/json, /api/form, /api/upload</p><p>Or connect to <a href="/ws">WebSocket</a></p><p>Or connect to <a href="/chat">WebSocket Chat</a></p>"#;

pub(crate) const ECHO_ENDPOINT_HTML: &str = "<h1>WebSocket Echo Endpoint</h1><p>This is a WebSocket endpoint. Please use a WebSocket client to connect.</p>";

const CHAT_ENDPOINT_HTML: &str = "<h1>WebSocket Chat Endpoint</h1><p>This is a WebSocket chat endpoint. Please use a WebSocket client to connect.</p>";

/// Register every demo route and controller on `server`.
pub fn register(server: &mut Server) -> Result<(), RouteError> {
    register_http(server.http_router())?;
    register_websocket(server.websocket_router())?;
    server
        .register(Arc::new(HelloController))?
        .register(Arc::new(HelloWsController))?;
    Ok(())
}

pub fn register_http(router: &mut HttpRouter) -> Result<(), RouteError> {
    router
        .get("/", |ctx: &mut RequestContext| {
            ctx.set_content_type("text/html");
            ctx.set_body(INDEX_HTML);
        })?
        .get("/hello", hello)?
        .get("/info", info)?
        .post("/api/json", api_json)?
        .post("/api/form", api_form)?
        .post("/api/upload", api_upload)?
        .get("/users/profile", |ctx: &mut RequestContext| {
            ctx.set_content_type("text/plain");
            ctx.set_body("This is the user's profile page.");
        })?
        .get("/users/:id", |ctx: &mut RequestContext| {
            let user_id = ctx.get_path_param("id").unwrap_or("unknown");
            let body = format!("Fetching user with ID: {user_id}");
            ctx.set_content_type("text/plain");
            ctx.set_body(body);
        })?
        .get("/items/:category/id/:item_id", |ctx: &mut RequestContext| {
            let category = ctx.get_path_param("category").unwrap_or("N/A");
            let item_id = ctx.get_path_param("item_id").unwrap_or("N/A");
            let body = format!("Fetching item {item_id} in category {category}");
            ctx.set_content_type("text/plain");
            ctx.set_body(body);
        })?
        .get("/files/*filepath", |ctx: &mut RequestContext| {
            let filepath = ctx.get_path_param("filepath").unwrap_or("N/A");
            let body = format!("Accessing file: {filepath}");
            ctx.set_content_type("text/plain");
            ctx.set_body(body);
        })?
        .get("/ws", |ctx: &mut RequestContext| upgrade_required(ctx, ECHO_ENDPOINT_HTML))?
        .get("/chat", |ctx: &mut RequestContext| upgrade_required(ctx, CHAT_ENDPOINT_HTML))?;
    Ok(())
}

pub fn register_websocket(router: &mut WebsocketRouter) -> Result<(), RouteError> {
    router
        .add_handler(
            "/ws",
            |ctx: &mut WebsocketContext| {
                tracing::info!(path = %ctx.path(), "Connection opened");
                ctx.send_text("Welcome to the echo service!");
            },
            |ctx: &mut WebsocketContext| reply_with_prefix(ctx, "Echo: "),
            |ctx: &mut WebsocketContext| tracing::info!(path = %ctx.path(), "Connection closed"),
            log_error,
        )?
        .add_handler(
            "/chat",
            |ctx: &mut WebsocketContext| {
                tracing::info!(path = %ctx.path(), "Chat connection opened");
                ctx.send_text("Welcome to the chat!");
            },
            |ctx: &mut WebsocketContext| reply_with_prefix(ctx, "You said: "),
            |ctx: &mut WebsocketContext| tracing::info!(path = %ctx.path(), "Chat connection closed"),
            log_error,
        )?;
    Ok(())
}

fn hello(ctx: &mut RequestContext) {
    let name = ctx.get_query_param("name").unwrap_or("Guest");
    let body = format!("Hello, {name}!");
    ctx.set_content_type("text/plain");
    ctx.set_body(body);
}

fn info(ctx: &mut RequestContext) {
    let mut body = String::from("<h1>Server Info</h1>");
    body.push_str(&format!("<p>Path: {}</p>", ctx.path()));
    body.push_str(&format!("<p>Method: {}</p>", ctx.method()));
    match ctx.get_header(header::USER_AGENT.as_str()) {
        Some(agent) => body.push_str(&format!("<p>User-Agent: {agent}</p>")),
        None => body.push_str("<p>User-Agent: Not provided</p>"),
    }
    ctx.set_content_type("text/html");
    ctx.set_body(body);
}

fn api_json(ctx: &mut RequestContext) {
    let body = ctx
        .get_json()
        .map(|value| format!("Received JSON:\n{value}"));
    match body {
        Some(body) => {
            ctx.set_content_type("application/json");
            ctx.set_body(body);
        }
        None => {
            ctx.set_status(StatusCode::BAD_REQUEST);
            ctx.set_content_type("text/plain");
            ctx.set_body("Invalid JSON or Content-Type not application/json");
        }
    }
}

fn api_form(ctx: &mut RequestContext) {
    let name = ctx.get_form_param("name");
    let email = ctx.get_form_param("email");
    let body = (name.is_some() || email.is_some()).then(|| {
        format!(
            "Received form data:\nName: {}\nEmail: {}",
            name.unwrap_or("N/A"),
            email.unwrap_or("N/A")
        )
    });

    ctx.set_content_type("text/plain");
    match body {
        Some(body) => ctx.set_body(body),
        None => {
            ctx.set_status(StatusCode::BAD_REQUEST);
            ctx.set_body("Invalid form data or Content-Type not application/x-www-form-urlencoded");
        }
    }
}

fn api_upload(ctx: &mut RequestContext) {
    let is_multipart = ctx
        .content_type()
        .is_some_and(|value| value.contains("multipart/form-data"));
    ctx.set_content_type("text/plain");
    if !is_multipart {
        ctx.set_status(StatusCode::BAD_REQUEST);
        ctx.set_body("Content-Type must be multipart/form-data for file uploads.");
        return;
    }

    let mut body = String::from("Multipart/form-data received!\n");
    match ctx.get_multipart_field("description") {
        Some(description) => body.push_str(&format!("Description: {description}\n")),
        None => body.push_str("Description field not found.\n"),
    }

    match ctx.get_uploaded_files("file") {
        Some([]) => body.push_str("No files uploaded for field 'file'.\n"),
        Some(files) => {
            for file in files {
                body.push_str(&format!(
                    "Uploaded File: {} ({} bytes, type: {})\n",
                    file.filename,
                    file.data.len(),
                    file.content_type
                ));
            }
        }
        None => body.push_str("File field 'file' not found.\n"),
    }
    ctx.set_body(body);
}

fn upgrade_required(ctx: &mut RequestContext, page: &'static str) {
    ctx.set_status(StatusCode::UPGRADE_REQUIRED);
    ctx.set_header(header::UPGRADE, "websocket");
    ctx.set_content_type("text/html");
    ctx.set_body(page);
}

/// Echo the current message back with `prefix`, keeping its frame type.
pub(crate) fn reply_with_prefix(ctx: &mut WebsocketContext, prefix: &str) {
    tracing::info!(path = %ctx.path(), message = ?ctx.message_text(), "Received");
    let mut reply = Vec::with_capacity(prefix.len() + ctx.message().len());
    reply.extend_from_slice(prefix.as_bytes());
    reply.extend_from_slice(ctx.message());
    ctx.send(reply, ctx.is_text());
}

pub(crate) fn log_error(ctx: &mut WebsocketContext) {
    let error = ctx.error().map(ToString::to_string).unwrap_or_default();
    tracing::warn!(path = %ctx.path(), error = %error, "WebSocket error");
}
