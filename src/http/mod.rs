//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (hyper HTTP/1.1, upgrades enabled)
//!     → server.rs (tower layers: request ID, trace, timeout, body limit)
//!     → upgrade request with a WebSocket route? → websocket::session
//!     → context.rs (RequestContext from head + buffered body)
//!     → routing::HttpRouter::dispatch (handler fills the response)
//!     → static_files.rs (only when no route matched)
//!     → response.rs (RequestContext → wire response)
//! ```

pub mod body;
pub mod context;
pub mod multipart;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use context::RequestContext;
pub use multipart::{MultipartError, MultipartForm, UploadedFile};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, Server, ServerError};
pub use static_files::StaticFiles;
