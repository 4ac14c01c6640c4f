//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use khttpd::config::ServerConfig;
use khttpd::http::ServerError;
use khttpd::lifecycle::Shutdown;
use khttpd::net::{ConnectionTracker, Listener};
use khttpd::{demo, Server};

/// Config tuned for tests: loopback, short timeouts.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.max_connections = 64;
    config.timeouts.idle_secs = 5;
    config.timeouts.shutdown_grace_secs = 2;
    config
}

/// A server with every demo route registered.
pub fn demo_server(config: ServerConfig) -> Server {
    let mut server = Server::new(config);
    demo::register(&mut server).expect("demo routes register");
    server
}

/// Run one request through the in-process app.
pub async fn oneshot(server: Server, request: Request<Body>) -> Response<Body> {
    server.into_app().oneshot(request).await.expect("infallible")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for `run` to return.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server stops in time")
            .expect("server task not panicked")
    }
}

/// Serve `server` on an ephemeral loopback port.
pub async fn spawn_server(server: Server) -> RunningServer {
    let socket = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = socket.local_addr().expect("local addr");
    let listener = Listener::from_tcp(socket, server.config().listener.max_connections)
        .expect("wrap listener");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let tracker = server.tracker();
    let handle = tokio::spawn(server.run(listener, receiver));

    RunningServer {
        addr,
        shutdown,
        tracker,
        handle,
    }
}

pub async fn spawn_demo_server() -> RunningServer {
    spawn_server(demo_server(test_config())).await
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
