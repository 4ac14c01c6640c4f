//! WebSocket sub-router and session lifecycle.
//!
//! # Data Flow
//! ```text
//! Upgrade request
//!     → router.rs (path → lifecycle handler)
//!     → handshake (axum WebSocketUpgrade)
//!     → session.rs (onopen → message loop → onerror? → onclose)
//!         ↕ transport.rs (frames in/out)
//!         ↕ context.rs (per-connection state + outbox)
//! ```
//!
//! Session states:
//! ```text
//! Connecting → Open → Closing → Closed
//!                 ↘ Erroring ↗
//! ```
//!
//! # Design Decisions
//! - Shares path syntax with the HTTP router but keeps a separate table
//! - Exactly one `on_open` and one `on_close` per established session
//! - Errors are terminal: `on_error` is always followed by teardown

pub mod context;
pub mod error;
pub mod router;
pub mod session;
pub mod transport;

pub use context::{SessionState, WebsocketContext, WebsocketSender};
pub use error::{WsError, WsErrorCode};
pub use router::{Callbacks, WebsocketHandler, WebsocketRouter};
pub use session::{run_session, SessionEnd, SessionOptions};
pub use transport::{AxumTransport, Inbound, Outbound, WsTransport};
