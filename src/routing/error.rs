//! Route registration errors.
//!
//! Everything in here is a configuration problem: it surfaces while routes
//! are being registered and must abort server initialization.

use axum::http::Method;

/// A route template that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern `{pattern}` has an empty segment at position {position}")]
    EmptySegment { pattern: String, position: usize },

    #[error("pattern `{pattern}` has a parameter without a name")]
    EmptyParamName { pattern: String },

    #[error("pattern `{pattern}` binds parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("pattern `{pattern}`: catch-all `*{name}` must be the last segment")]
    CatchAllNotLast { pattern: String, name: String },
}

/// Invalid or conflicting route registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("duplicate route {method} `{pattern}` (already registered as `{existing}`)")]
    Duplicate {
        method: Method,
        pattern: String,
        existing: String,
    },

    #[error("duplicate WebSocket route `{pattern}` (already registered as `{existing}`)")]
    DuplicateWebsocket { pattern: String, existing: String },
}
