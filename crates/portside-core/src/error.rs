//! Engine error types

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the reconciliation core and its adapters
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Storage error: {message}")]
    Store { message: String },

    #[error("Discovery error: {message}")]
    Discovery { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    // ─────────────────────────────────────────────────────────────
    // Wait Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Timed out after {0:?} waiting for the requested board and port")]
    Timeout(Duration),

    #[error("Notification channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    pub fn timeout(waited: Duration) -> Self {
        Self::Timeout(waited)
    }

    /// Check if this is the typed give-up outcome of a bounded wait,
    /// as opposed to a failure of the wait machinery itself.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::ChannelClosed | Error::Notification { .. }
        )
    }
}
