use std::fmt;

/// Category of a session-ending WebSocket failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WsErrorCode {
    /// Malformed frame or transport protocol violation.
    Protocol,
    /// Peer vanished without a close frame.
    Reset,
    /// No inbound frame within the idle window.
    Timeout,
    /// A callback panicked.
    Internal,
}

impl WsErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            WsErrorCode::Protocol => "protocol",
            WsErrorCode::Reset => "reset",
            WsErrorCode::Timeout => "timeout",
            WsErrorCode::Internal => "internal",
        }
    }

    /// RFC 6455 close code sent when a session ends with this error.
    pub fn close_code(self) -> u16 {
        match self {
            WsErrorCode::Protocol => 1002,
            WsErrorCode::Reset | WsErrorCode::Timeout => 1001,
            WsErrorCode::Internal => 1011,
        }
    }
}

impl fmt::Display for WsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct WsError {
    pub code: WsErrorCode,
    pub message: String,
}

impl WsError {
    pub fn new(code: WsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
