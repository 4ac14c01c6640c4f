//! khttpd: URL routing and request-context engine for HTTP and WebSocket.

// Core subsystems
pub mod config;
pub mod controller;
pub mod http;
pub mod net;
pub mod routing;
pub mod websocket;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

// Demo application
pub mod demo;

pub use config::ServerConfig;
pub use controller::Controller;
pub use http::{RequestContext, Server};
pub use lifecycle::Shutdown;
pub use routing::HttpRouter;
pub use websocket::{WebsocketContext, WebsocketRouter};
