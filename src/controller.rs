//! Controllers: objects that register a group of related routes.
//!
//! Registration consumes and hands back the controller's `Arc`, so calls chain:
//!
//! ```
//! use std::sync::Arc;
//! use khttpd::controller::Controller;
//! use khttpd::http::RequestContext;
//! use khttpd::routing::{HttpRouter, RouteError};
//! use khttpd::websocket::WebsocketRouter;
//!
//! struct Ping;
//!
//! impl Controller for Ping {
//!     fn register_routes(self: Arc<Self>, router: &mut HttpRouter) -> Result<Arc<Self>, RouteError> {
//!         router.get("/ping", |ctx: &mut RequestContext| ctx.set_body("pong"))?;
//!         Ok(self)
//!     }
//! }
//!
//! let mut http = HttpRouter::new();
//! let mut ws = WebsocketRouter::new();
//! Arc::new(Ping)
//!     .register_routes(&mut http)?
//!     .register_ws_routes(&mut ws)?;
//! assert_eq!(http.len(), 1);
//! # Ok::<(), RouteError>(())
//! ```

use std::sync::Arc;

use crate::routing::{HttpRouter, RouteError};
use crate::websocket::WebsocketRouter;

pub trait Controller: Send + Sync + 'static {
    fn register_routes(self: Arc<Self>, router: &mut HttpRouter) -> Result<Arc<Self>, RouteError>;

    /// WebSocket routes; none by default.
    fn register_ws_routes(self: Arc<Self>, _router: &mut WebsocketRouter) -> Result<Arc<Self>, RouteError> {
        Ok(self)
    }
}
