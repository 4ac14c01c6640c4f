//! Per-connection state handed to lifecycle callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::mpsc;

use crate::routing::PathParams;
use crate::websocket::error::WsError;
use crate::websocket::transport::Outbound;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Erroring,
    Closing,
    Closed,
}

/// Cloneable handle for queueing frames on a session, usable from any task.
///
/// Once the session starts closing every send is a no-op returning `false`.
#[derive(Debug, Clone)]
pub struct WebsocketSender {
    tx: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
}

impl WebsocketSender {
    /// Queue `payload` as a text frame when `is_text`, otherwise as binary.
    pub fn send(&self, payload: impl Into<Bytes>, is_text: bool) -> bool {
        let payload = payload.into();
        if !is_text {
            return self.push(Outbound::Binary(payload));
        }
        match String::from_utf8(payload.to_vec()) {
            Ok(text) => self.push(Outbound::Text(text)),
            Err(_) => {
                tracing::warn!("Dropping text frame with invalid UTF-8");
                false
            }
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.push(Outbound::Text(text.into()))
    }

    pub fn send_binary(&self, data: impl Into<Bytes>) -> bool {
        self.push(Outbound::Binary(data.into()))
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn push(&self, frame: Outbound) -> bool {
        self.is_open() && self.tx.send(frame).is_ok()
    }
}

/// State of one WebSocket connection, mutated in place over its lifetime.
///
/// `message`/`is_text` describe the frame being delivered to `on_message`,
/// `error` the failure being delivered to `on_error`.
#[derive(Debug)]
pub struct WebsocketContext {
    path: String,
    params: PathParams,
    message: Bytes,
    is_text: bool,
    error: Option<WsError>,
    state: SessionState,
    sender: WebsocketSender,
}

impl WebsocketContext {
    /// Create a context and the receiving end of its outbox.
    pub fn new(path: impl Into<String>, params: PathParams) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Self {
            path: path.into(),
            params,
            message: Bytes::new(),
            is_text: false,
            error: None,
            state: SessionState::Connecting,
            sender: WebsocketSender {
                tx,
                open: Arc::new(AtomicBool::new(false)),
            },
        };
        (ctx, rx)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.params
    }

    pub fn message(&self) -> &Bytes {
        &self.message
    }

    /// The current message as text, `None` for non-UTF-8 payloads.
    pub fn message_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.message).ok()
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    pub fn error(&self) -> Option<&WsError> {
        self.error.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn send(&self, payload: impl Into<Bytes>, is_text: bool) -> bool {
        self.sender.send(payload, is_text)
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.sender.send_text(text)
    }

    pub fn send_binary(&self, data: impl Into<Bytes>) -> bool {
        self.sender.send_binary(data)
    }

    pub fn sender(&self) -> WebsocketSender {
        self.sender.clone()
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
        let open = state == SessionState::Open;
        self.sender.open.store(open, Ordering::Release);
    }

    pub(crate) fn set_message(&mut self, payload: Bytes, is_text: bool) {
        self.message = payload;
        self.is_text = is_text;
    }

    pub(crate) fn clear_message(&mut self) {
        self.message = Bytes::new();
        self.is_text = false;
    }

    pub(crate) fn set_error(&mut self, error: Option<WsError>) {
        self.error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_are_queued_only_while_open() {
        let (mut ctx, mut rx) = WebsocketContext::new("/ws", PathParams::new());
        assert_eq!(ctx.state(), SessionState::Connecting);
        assert!(!ctx.send_text("early"));

        ctx.set_state(SessionState::Open);
        assert!(ctx.send_text("hello"));
        assert!(ctx.send(Bytes::from_static(b"\x01\x02"), false));
        assert!(ctx.sender().send_binary(vec![3u8]));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("hello".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Binary(Bytes::from_static(b"\x01\x02")));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Binary(Bytes::from_static(b"\x03")));

        let detached = ctx.sender();
        ctx.set_state(SessionState::Closing);
        assert!(!ctx.send_text("late"));
        assert!(!detached.send_text("late"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn text_send_rejects_invalid_utf8() {
        let (mut ctx, mut rx) = WebsocketContext::new("/ws", PathParams::new());
        ctx.set_state(SessionState::Open);
        assert!(!ctx.send(Bytes::from_static(&[0xff, 0xfe]), true));
        assert!(ctx.send("ok", true));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("ok".into()));
    }

    #[test]
    fn message_accessors() {
        let (mut ctx, _rx) = WebsocketContext::new("/rooms/7", PathParams::from([("room".to_string(), "7".to_string())]));
        ctx.set_message(Bytes::from_static(b"hi"), true);
        assert_eq!(ctx.message_text(), Some("hi"));
        assert!(ctx.is_text());
        assert_eq!(ctx.get_path_param("room"), Some("7"));

        ctx.clear_message();
        assert!(ctx.message().is_empty());
        assert!(!ctx.is_text());
    }
}
