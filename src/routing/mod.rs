//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, single-threaded):
//!     router.get("/users/:id", handler)
//!     → pattern.rs (compile into literal / :param / *catch-all segments)
//!     → table.rs (reject duplicate shapes per method)
//!
//! Incoming Request (method, path):
//!     → table.rs (match every pattern against the path)
//!     → pick the most specific entry for the method
//!     → Return: Found / MethodNotAllowed(allow list) / NotFound
//!     → router.rs (bind path params, invoke handler)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: literal beats parameter beats catch-all, registration order never matters
//! - Explicit NotFound / MethodNotAllowed rather than silent default

pub mod error;
pub mod handler;
pub mod pattern;
pub mod router;
pub mod table;

pub use error::{PatternError, RouteError};
pub use handler::Handler;
pub use pattern::{PathParams, PathPattern, Segment};
pub use router::{DispatchOutcome, HttpRouter};
pub use table::{RouteEntry, RouteMatch, RouteTable};
