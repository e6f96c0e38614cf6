//! Unified error types for the Hearth core.

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The network dial failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The connection dropped and could not be restored.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// A write failed after exhausting retries.
    #[error("failed to send: {0}")]
    SendFailed(String),

    /// Operation attempted on a connection that was never opened.
    #[error("not connected; call connect() first")]
    NotConnected,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors returned by the [`Bot`](crate::Bot) for caller mistakes. These are
/// reported synchronously and leave no side effect behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BotError {
    /// Handler registration after `start()`; the fan-out loop is already
    /// wired to a fixed handler set.
    #[error("bot already listening; register handlers before start()")]
    AlreadyListening,

    /// A plugin with this identity is already registered.
    #[error("plugin '{id}' already registered")]
    DuplicatePlugin {
        /// The duplicate plugin identity.
        id: String,
    },

    /// Only one poll may run at a time.
    #[error("a poll is already running")]
    PollAlreadyRunning,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;
