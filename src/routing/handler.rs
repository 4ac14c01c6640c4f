//! The unit of behavior bound to an HTTP route.

use crate::http::RequestContext;

/// Anything that can serve a request by mutating its context.
///
/// Closures `Fn(&mut RequestContext)` implement this automatically, so most
/// routes are registered inline:
///
/// ```
/// use khttpd::routing::HttpRouter;
///
/// let mut router = HttpRouter::new();
/// router
///     .get("/ping", |ctx: &mut khttpd::http::RequestContext| ctx.set_body("pong"))
///     .unwrap();
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: &mut RequestContext);
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut RequestContext) {
        self(ctx)
    }
}
