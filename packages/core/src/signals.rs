//! Termination signals observed while the supervisor waits on the backend

use std::io;

/// Signal number reported for Ctrl-C
pub const SIGINT: i32 = 2;
/// Signal number reported for a termination request
pub const SIGTERM: i32 = 15;

/// Listener for SIGTERM and SIGINT (Ctrl-C on non-Unix platforms)
///
/// Install it before the backend is launched so a signal that arrives during
/// the wait is never missed.
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    term: tokio::signal::unix::Signal,
    #[cfg(unix)]
    int: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the handlers; must be called from within a tokio runtime
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next signal and return its number
    #[cfg(unix)]
    pub async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.term.recv() => SIGTERM,
            _ = self.int.recv() => SIGINT,
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> i32 {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        SIGINT
    }
}

/// Serializes tests that install handlers: a raised signal reaches every
/// listener in the process
#[cfg(test)]
pub(crate) static TEST_SIGNAL_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());
