//! Frame transport abstraction.
//!
//! The session driver only needs "next message", "send message" and "close";
//! hiding the socket behind [`WsTransport`] keeps it testable without a network.

use std::future::Future;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};

use crate::websocket::error::{WsError, WsErrorCode};

/// A frame received from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message { payload: Bytes, is_text: bool },
    /// Ping or pong: proof of life, no payload for the handler.
    Keepalive,
    Close,
}

/// A data frame queued for the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Bytes),
}

pub trait WsTransport: Send {
    /// Next frame from the peer; `None` once the connection is gone.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Inbound, WsError>>> + Send;

    fn send(&mut self, frame: Outbound) -> impl Future<Output = Result<(), WsError>> + Send;

    /// Send a close frame. Failures are ignored; the session is over either way.
    fn close(&mut self, code: u16, reason: &'static str) -> impl Future<Output = ()> + Send;
}

/// [`WsTransport`] over an upgraded axum socket.
///
/// Ping/pong is answered by the socket itself and only surfaces as
/// [`Inbound::Keepalive`].
pub struct AxumTransport {
    socket: WebSocket,
}

impl AxumTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl WsTransport for AxumTransport {
    async fn recv(&mut self) -> Option<Result<Inbound, WsError>> {
        let message = match self.socket.recv().await? {
            Ok(message) => message,
            Err(err) => return Some(Err(WsError::new(WsErrorCode::Protocol, err.to_string()))),
        };
        let inbound = match message {
            Message::Text(text) => Inbound::Message {
                payload: Bytes::copy_from_slice(text.as_str().as_bytes()),
                is_text: true,
            },
            Message::Binary(data) => Inbound::Message {
                payload: data,
                is_text: false,
            },
            Message::Close(_) => Inbound::Close,
            Message::Ping(_) | Message::Pong(_) => Inbound::Keepalive,
        };
        Some(Ok(inbound))
    }

    async fn send(&mut self, frame: Outbound) -> Result<(), WsError> {
        let message = match frame {
            Outbound::Text(text) => Message::Text(text.into()),
            Outbound::Binary(data) => Message::Binary(data),
        };
        self.socket
            .send(message)
            .await
            .map_err(|err| WsError::new(WsErrorCode::Reset, err.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &'static str) {
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        };
        if let Err(err) = self.socket.send(Message::Close(Some(frame))).await {
            tracing::trace!(error = %err, "Close frame not delivered");
        }
    }
}
