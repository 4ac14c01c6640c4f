//! WebSocket route table.
//!
//! # Responsibilities
//! - Bind a path pattern to a lifecycle handler (open, message, close, error)
//! - Resolve an upgrade request path to its handler and path parameters
//!
//! # Design Decisions
//! - Same pattern syntax and specificity rules as the HTTP router
//! - One handler per path shape; no method dimension
//! - Frozen behind an `Arc` once the server starts

use std::fmt;
use std::sync::Arc;

use crate::routing::{PathParams, PathPattern, RouteError};
use crate::websocket::context::WebsocketContext;

/// Lifecycle callbacks for one WebSocket route. Every method defaults to a no-op.
///
/// ```
/// use khttpd::websocket::{WebsocketContext, WebsocketHandler};
///
/// struct Echo;
///
/// impl WebsocketHandler for Echo {
///     fn on_message(&self, ctx: &mut WebsocketContext) {
///         let reply = format!("Echo: {}", ctx.message_text().unwrap_or_default());
///         ctx.send_text(reply);
///     }
/// }
/// ```
pub trait WebsocketHandler: Send + Sync + 'static {
    fn on_open(&self, _ctx: &mut WebsocketContext) {}
    fn on_message(&self, _ctx: &mut WebsocketContext) {}
    fn on_close(&self, _ctx: &mut WebsocketContext) {}
    fn on_error(&self, _ctx: &mut WebsocketContext) {}
}

impl<H: WebsocketHandler> WebsocketHandler for Arc<H> {
    fn on_open(&self, ctx: &mut WebsocketContext) {
        (**self).on_open(ctx)
    }
    fn on_message(&self, ctx: &mut WebsocketContext) {
        (**self).on_message(ctx)
    }
    fn on_close(&self, ctx: &mut WebsocketContext) {
        (**self).on_close(ctx)
    }
    fn on_error(&self, ctx: &mut WebsocketContext) {
        (**self).on_error(ctx)
    }
}

type Callback = Box<dyn Fn(&mut WebsocketContext) + Send + Sync>;

/// A [`WebsocketHandler`] assembled from four closures.
pub struct Callbacks {
    on_open: Callback,
    on_message: Callback,
    on_close: Callback,
    on_error: Callback,
}

impl Callbacks {
    pub fn new<O, M, C, E>(on_open: O, on_message: M, on_close: C, on_error: E) -> Self
    where
        O: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        M: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        C: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        E: Fn(&mut WebsocketContext) + Send + Sync + 'static,
    {
        Self {
            on_open: Box::new(on_open),
            on_message: Box::new(on_message),
            on_close: Box::new(on_close),
            on_error: Box::new(on_error),
        }
    }
}

impl WebsocketHandler for Callbacks {
    fn on_open(&self, ctx: &mut WebsocketContext) {
        (self.on_open)(ctx)
    }
    fn on_message(&self, ctx: &mut WebsocketContext) {
        (self.on_message)(ctx)
    }
    fn on_close(&self, ctx: &mut WebsocketContext) {
        (self.on_close)(ctx)
    }
    fn on_error(&self, ctx: &mut WebsocketContext) {
        (self.on_error)(ctx)
    }
}

struct WebsocketRoute {
    pattern: PathPattern,
    handler: Arc<dyn WebsocketHandler>,
}

#[derive(Default)]
pub struct WebsocketRouter {
    routes: Vec<WebsocketRoute>,
}

impl WebsocketRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register four lifecycle closures for `pattern`.
    pub fn add_handler<O, M, C, E>(
        &mut self,
        pattern: &str,
        on_open: O,
        on_message: M,
        on_close: C,
        on_error: E,
    ) -> Result<&mut Self, RouteError>
    where
        O: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        M: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        C: Fn(&mut WebsocketContext) + Send + Sync + 'static,
        E: Fn(&mut WebsocketContext) + Send + Sync + 'static,
    {
        self.add(pattern, Callbacks::new(on_open, on_message, on_close, on_error))
    }

    /// Register any [`WebsocketHandler`] implementor for `pattern`.
    pub fn add<H: WebsocketHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        let compiled = PathPattern::compile(pattern)?;
        if let Some(existing) = self
            .routes
            .iter()
            .find(|route| route.pattern.same_shape(&compiled))
        {
            return Err(RouteError::DuplicateWebsocket {
                pattern: pattern.to_string(),
                existing: existing.pattern.to_string(),
            });
        }

        self.routes.push(WebsocketRoute {
            pattern: compiled,
            handler: Arc::new(handler),
        });
        tracing::debug!(pattern = %pattern, "WebSocket route registered");
        Ok(self)
    }

    /// The most specific handler whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Option<(Arc<dyn WebsocketHandler>, PathParams)> {
        self.routes
            .iter()
            .filter_map(|route| route.pattern.matches(path).map(|params| (route, params)))
            .min_by(|(a, _), (b, _)| a.pattern.specificity_cmp(&b.pattern))
            .map(|(route, params)| (Arc::clone(&route.handler), params))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for WebsocketRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|route| route.pattern.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::context::SessionState;
    use crate::websocket::transport::Outbound;

    fn noop(_: &mut WebsocketContext) {}

    fn reply_with(tag: &'static str) -> impl Fn(&mut WebsocketContext) + Send + Sync + 'static {
        move |ctx: &mut WebsocketContext| {
            ctx.send_text(tag);
        }
    }

    fn run_open(handler: &dyn WebsocketHandler, path: &str) -> Option<Outbound> {
        let (mut ctx, mut rx) = WebsocketContext::new(path, PathParams::new());
        ctx.set_state(SessionState::Open);
        handler.on_open(&mut ctx);
        rx.try_recv().ok()
    }

    #[test]
    fn resolves_registered_paths_only() {
        let mut router = WebsocketRouter::new();
        router
            .add_handler("/ws", reply_with("ws"), noop, noop, noop)
            .unwrap()
            .add_handler("/chat", reply_with("chat"), noop, noop, noop)
            .unwrap();
        assert_eq!(router.len(), 2);

        let (handler, params) = router.resolve("/chat").unwrap();
        assert!(params.is_empty());
        assert_eq!(run_open(&*handler, "/chat"), Some(Outbound::Text("chat".into())));
        assert!(router.resolve("/other").is_none());
    }

    #[test]
    fn literal_route_beats_parameter_route() {
        let mut router = WebsocketRouter::new();
        router
            .add_handler("/rooms/:id", reply_with("param"), noop, noop, noop)
            .unwrap()
            .add_handler("/rooms/lobby", reply_with("literal"), noop, noop, noop)
            .unwrap();

        let (handler, _) = router.resolve("/rooms/lobby").unwrap();
        assert_eq!(run_open(&*handler, "/rooms/lobby"), Some(Outbound::Text("literal".into())));

        let (handler, params) = router.resolve("/rooms/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(run_open(&*handler, "/rooms/42"), Some(Outbound::Text("param".into())));
    }

    #[test]
    fn duplicate_shapes_are_rejected() {
        let mut router = WebsocketRouter::new();
        router.add_handler("/rooms/:id", noop, noop, noop, noop).unwrap();
        let err = router
            .add_handler("/rooms/:name", noop, noop, noop, noop)
            .unwrap_err();
        assert!(matches!(err, RouteError::DuplicateWebsocket { .. }));

        assert!(matches!(
            router.add_handler("rooms", noop, noop, noop, noop),
            Err(RouteError::InvalidPattern(_))
        ));
    }

    #[test]
    fn trait_defaults_are_no_ops() {
        struct Silent;
        impl WebsocketHandler for Silent {}

        let mut router = WebsocketRouter::new();
        router.add("/quiet", Arc::new(Silent)).unwrap();
        let (handler, _) = router.resolve("/quiet").unwrap();
        assert_eq!(run_open(&*handler, "/quiet"), None);
    }
}
