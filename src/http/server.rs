//! HTTP server setup and connection handling.
//!
//! # Responsibilities
//! - Own both route tables while routes are registered
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve each accepted connection with hyper, upgrades enabled
//! - Hand WebSocket upgrades to the session driver
//! - Drain connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tower::Service;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::controller::Controller;
use crate::http::context::RequestContext;
use crate::http::request::{request_id_header, UuidRequestId, X_REQUEST_ID};
use crate::http::static_files::StaticFiles;
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::routing::{DispatchOutcome, HttpRouter, RouteError};
use crate::websocket::{run_session, AxumTransport, SessionOptions, WebsocketRouter};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("route registration failed: {0}")]
    Route(#[from] RouteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    http: HttpRouter,
    websocket: WebsocketRouter,
    static_files: Option<StaticFiles>,
    session: SessionOptions,
    max_body_size: usize,
    tracker: ConnectionTracker,
}

/// HTTP + WebSocket server.
///
/// Routes are registered on the mutable routers first; `run` (or `into_app`)
/// freezes them for the lifetime of the server.
pub struct Server {
    config: ServerConfig,
    http: HttpRouter,
    websocket: WebsocketRouter,
    tracker: ConnectionTracker,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            http: HttpRouter::new(),
            websocket: WebsocketRouter::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn http_router(&mut self) -> &mut HttpRouter {
        &mut self.http
    }

    pub fn websocket_router(&mut self) -> &mut WebsocketRouter {
        &mut self.websocket
    }

    /// Let a controller register its HTTP and WebSocket routes.
    pub fn register<C: Controller>(&mut self, controller: Arc<C>) -> Result<&mut Self, RouteError> {
        controller
            .register_routes(&mut self.http)?
            .register_ws_routes(&mut self.websocket)?;
        Ok(self)
    }

    /// Tracker counting live connections and sessions.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Freeze the route tables into a ready-to-serve Axum router.
    pub fn into_app(self) -> Router {
        tracing::info!(
            http_routes = self.http.len(),
            websocket_routes = self.websocket.len(),
            "Route tables frozen"
        );

        let static_files = self.config.static_files.web_root.as_ref().map(|root| {
            tracing::info!(web_root = %root.display(), "Serving static files");
            StaticFiles::new(root)
        });

        let state = AppState {
            inner: Arc::new(AppInner {
                http: self.http,
                websocket: self.websocket,
                static_files,
                session: SessionOptions {
                    idle_timeout: Some(self.config.timeouts.idle()),
                },
                max_body_size: self.config.limits.max_body_size,
                tracker: self.tracker,
            }),
        };
        Self::build_router(&self.config, state)
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(request_id_header(), UuidRequestId))
    }

    /// Run the server, accepting connections until `shutdown` fires, then
    /// drain open connections for up to `shutdown_grace_secs`.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let idle = self.config.timeouts.idle();
        let grace = self.config.timeouts.shutdown_grace();
        let tracker = self.tracker.clone();
        let app = self.into_app();

        tracing::info!(address = %addr, "HTTP server starting");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(ListenerError::Closed) => break,
                        Err(err) => {
                            tracing::warn!(error = %err, "Accept failed");
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            continue;
                        }
                    };
                    let guard = tracker.track();
                    let drain = tracker.drain_receiver();
                    tokio::spawn(serve_connection(stream, peer, app.clone(), idle, drain, guard, permit));
                }
            }
        }

        tracker.begin_drain();
        if tracker.wait_for_drain(grace).await {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = tracker.active_count(),
                "Shutdown grace period elapsed with open connections"
            );
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
    idle: Duration,
    mut drain: watch::Receiver<bool>,
    guard: ConnectionGuard,
    _permit: ConnectionPermit,
) {
    let connection_id = guard.id();
    tracing::trace!(connection_id = %connection_id, peer_addr = %peer, "Serving connection");

    let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        app.clone().call(request)
    });

    let connection = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(idle)
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades();
    tokio::pin!(connection);

    let mut draining = false;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(err) = result {
                    tracing::debug!(connection_id = %connection_id, peer_addr = %peer, error = %err, "Connection ended with error");
                }
                break;
            }
            _ = drain.wait_for(|draining| *draining), if !draining => {
                draining = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }
    drop(guard);
}

/// Catch-all handler: WebSocket upgrade or HTTP dispatch.
async fn dispatch(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    // Upgrade requests without a WebSocket route fall through to HTTP dispatch.
    if let Ok(upgrade) = upgrade {
        if let Some((handler, params)) = state.inner.websocket.resolve(request.uri().path()) {
            let path = request.uri().path().to_string();
            let guard = state.inner.tracker.track();
            let options = state.inner.session.clone();
            let drain = state.inner.tracker.drain_receiver();
            tracing::debug!(path = %path, connection_id = %guard.id(), "WebSocket upgrade accepted");

            let failed_path = path.clone();
            let response = upgrade
                .on_failed_upgrade(move |err| {
                    tracing::warn!(path = %failed_path, error = %err, "WebSocket handshake failed");
                })
                .on_upgrade(move |socket| async move {
                    let connection_id = guard.id();
                    let end = run_session(handler, path, params, AxumTransport::new(socket), options, drain).await;
                    tracing::debug!(connection_id = %connection_id, end = ?end, "WebSocket session finished");
                    drop(guard);
                });
            metrics::record_request(method.as_str(), response.status().as_u16(), start);
            return response;
        }
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.inner.max_body_size).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(path = %parts.uri.path(), error = %err, "Request body rejected");
            metrics::record_request(method.as_str(), StatusCode::PAYLOAD_TOO_LARGE.as_u16(), start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let mut ctx = RequestContext::from_parts(&parts, body);
    let outcome = state.inner.http.dispatch(&mut ctx);

    if outcome == DispatchOutcome::NotFound {
        if let Some(files) = &state.inner.static_files {
            if let Some(response) = files.serve(&parts).await {
                metrics::record_request(method.as_str(), response.status().as_u16(), start);
                return response;
            }
        }
    }

    tracing::debug!(status = %ctx.status(), outcome = ?outcome, "Request handled");
    metrics::record_request(method.as_str(), ctx.status().as_u16(), start);
    ctx.into_response()
}
