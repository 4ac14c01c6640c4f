//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) or SIGTERM
//! - Report which signal arrived so shutdown can be logged
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Installing a handler can fail; that error is returned, not panicked on

use std::io;

/// Wait until the process is asked to terminate.
///
/// Returns the name of the signal that arrived.
pub async fn wait_for_termination() -> io::Result<&'static str> {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.map(|()| "SIGINT")
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        signal.recv().await;
        Ok::<_, io::Error>("SIGTERM")
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<&'static str>>();

    tokio::select! {
        received = ctrl_c => received,
        received = terminate => received,
    }
}
