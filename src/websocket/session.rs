//! Session driver: runs one WebSocket connection through its lifecycle.
//!
//! # Responsibilities
//! - Invoke `on_open` once, then `on_message` per data frame
//! - Turn transport errors, idle timeouts and callback panics into `on_error`
//! - Invoke `on_close` exactly once and send the close frame
//! - Flush frames queued through the context's sender
//!
//! # Design Decisions
//! - Errors are terminal; frames queued by `on_error` are discarded
//! - The idle deadline moves on every inbound frame, keepalives included
//! - Sends race the idle deadline and the drain signal, so a peer that
//!   stops reading cannot hold the session open
//! - Server shutdown closes with 1001 and skips `on_error`
//! - Teardown I/O (final flush, close frame) is bounded by `TEARDOWN_TIMEOUT`

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, timeout, timeout_at, Instant};

use crate::observability::metrics;
use crate::routing::PathParams;
use crate::websocket::context::{SessionState, WebsocketContext};
use crate::websocket::error::{WsError, WsErrorCode};
use crate::websocket::router::WebsocketHandler;
use crate::websocket::transport::{Inbound, Outbound, WsTransport};

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_GOING_AWAY: u16 = 1001;
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Close the session when no frame arrives, or a queued frame cannot be
    /// written, within this window.
    pub idle_timeout: Option<Duration>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer sent a close frame.
    Clean,
    /// The server is draining.
    Shutdown,
    Error(WsError),
}

impl SessionEnd {
    fn close_frame(&self) -> (u16, &'static str) {
        match self {
            SessionEnd::Clean => (CLOSE_NORMAL, ""),
            SessionEnd::Shutdown => (CLOSE_GOING_AWAY, "server shutting down"),
            SessionEnd::Error(err) => match err.code {
                WsErrorCode::Timeout => (err.code.close_code(), "idle timeout"),
                WsErrorCode::Internal => (err.code.close_code(), "internal error"),
                _ => (err.code.close_code(), ""),
            },
        }
    }
}

enum Event {
    Inbound(Inbound),
    Outbound(Outbound),
    Ended(SessionEnd),
    ShutdownUnavailable,
}

/// Drive `transport` until the session ends, invoking `handler` callbacks.
pub async fn run_session<T: WsTransport>(
    handler: Arc<dyn WebsocketHandler>,
    path: String,
    params: PathParams,
    mut transport: T,
    options: SessionOptions,
    mut shutdown: watch::Receiver<bool>,
) -> SessionEnd {
    let (mut ctx, mut outbox) = WebsocketContext::new(path, params);
    ctx.set_state(SessionState::Open);
    metrics::websocket_session_opened();
    tracing::debug!(path = %ctx.path(), "WebSocket session open");

    let mut ended = invoke("on_open", || handler.on_open(&mut ctx)).err().map(SessionEnd::Error);
    let mut deadline = options.idle_timeout.map(|idle| Instant::now() + idle);
    let mut watch_shutdown = true;

    while ended.is_none() {
        if let Err(end) = guarded(flush(&mut transport, &mut outbox), deadline, &mut shutdown).await {
            ended = Some(end);
            break;
        }

        let event = tokio::select! {
            Some(frame) = outbox.recv() => Event::Outbound(frame),
            received = next_inbound(&mut transport, deadline) => match received {
                Ok(inbound) => Event::Inbound(inbound),
                Err(end) => Event::Ended(end),
            },
            changed = shutdown.wait_for(|draining| *draining), if watch_shutdown => {
                if changed.is_ok() {
                    Event::Ended(SessionEnd::Shutdown)
                } else {
                    Event::ShutdownUnavailable
                }
            }
        };

        match event {
            Event::Outbound(frame) => {
                if let Err(end) = guarded(transport.send(frame), deadline, &mut shutdown).await {
                    ended = Some(end);
                }
            }
            Event::Inbound(Inbound::Close) => ended = Some(SessionEnd::Clean),
            Event::Inbound(Inbound::Keepalive) => {
                deadline = options.idle_timeout.map(|idle| Instant::now() + idle);
            }
            Event::Inbound(Inbound::Message { payload, is_text }) => {
                deadline = options.idle_timeout.map(|idle| Instant::now() + idle);
                metrics::record_websocket_message(is_text);
                ctx.set_message(payload, is_text);
                if let Err(err) = invoke("on_message", || handler.on_message(&mut ctx)) {
                    ended = Some(SessionEnd::Error(err));
                }
                ctx.clear_message();
            }
            Event::Ended(end) => ended = Some(end),
            Event::ShutdownUnavailable => watch_shutdown = false,
        }
    }

    let end = ended.unwrap_or(SessionEnd::Clean);
    match &end {
        SessionEnd::Error(err) => {
            tracing::warn!(path = %ctx.path(), code = %err.code, error = %err.message, "WebSocket session error");
            ctx.set_state(SessionState::Erroring);
            ctx.set_error(Some(err.clone()));
            if let Err(panicked) = invoke("on_error", || handler.on_error(&mut ctx)) {
                tracing::error!(path = %ctx.path(), error = %panicked, "WebSocket error callback failed");
            }
            while outbox.try_recv().is_ok() {}
        }
        SessionEnd::Shutdown => {
            match timeout(TEARDOWN_TIMEOUT, flush(&mut transport, &mut outbox)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::debug!(path = %ctx.path(), error = %err, "Pending frames lost during shutdown");
                }
                Err(_) => tracing::debug!(path = %ctx.path(), "Peer stalled while flushing on shutdown"),
            }
            while outbox.try_recv().is_ok() {}
        }
        SessionEnd::Clean => while outbox.try_recv().is_ok() {},
    }

    ctx.set_state(SessionState::Closing);
    if let Err(panicked) = invoke("on_close", || handler.on_close(&mut ctx)) {
        tracing::error!(path = %ctx.path(), error = %panicked, "WebSocket close callback failed");
    }
    ctx.set_state(SessionState::Closed);

    let (code, reason) = end.close_frame();
    if timeout(TEARDOWN_TIMEOUT, transport.close(code, reason)).await.is_err() {
        tracing::debug!(path = %ctx.path(), close_code = code, "Close frame not written in time");
    }
    metrics::websocket_session_closed();
    tracing::debug!(path = %ctx.path(), close_code = code, "WebSocket session closed");
    end
}

/// Next data or close frame, or the reason the session must end.
async fn next_inbound<T: WsTransport>(
    transport: &mut T,
    deadline: Option<Instant>,
) -> Result<Inbound, SessionEnd> {
    let received = match deadline {
        Some(deadline) => timeout_at(deadline, transport.recv()).await.map_err(|_| {
            SessionEnd::Error(WsError::new(WsErrorCode::Timeout, "no frame within the idle timeout"))
        })?,
        None => transport.recv().await,
    };

    match received {
        Some(Ok(inbound)) => Ok(inbound),
        Some(Err(err)) => Err(SessionEnd::Error(err)),
        None => Err(SessionEnd::Error(WsError::new(
            WsErrorCode::Reset,
            "connection closed without a close frame",
        ))),
    }
}

/// Run outbound `io` unless the idle deadline passes or the server starts
/// draining first.
async fn guarded(
    io: impl Future<Output = Result<(), WsError>>,
    deadline: Option<Instant>,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), SessionEnd> {
    tokio::select! {
        result = io => result.map_err(SessionEnd::Error),
        _ = idle_expired(deadline) => Err(SessionEnd::Error(WsError::new(
            WsErrorCode::Timeout,
            "peer stopped reading within the idle timeout",
        ))),
        Ok(_) = shutdown.wait_for(|draining| *draining) => Err(SessionEnd::Shutdown),
    }
}

async fn idle_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn flush<T: WsTransport>(
    transport: &mut T,
    outbox: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), WsError> {
    while let Ok(frame) = outbox.try_recv() {
        transport.send(frame).await?;
    }
    Ok(())
}

fn invoke(stage: &'static str, callback: impl FnOnce()) -> Result<(), WsError> {
    panic::catch_unwind(AssertUnwindSafe(callback))
        .map_err(|_| WsError::new(WsErrorCode::Internal, format!("{stage} callback panicked")))
}
