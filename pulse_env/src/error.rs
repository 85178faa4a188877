//! Error types for the Pulse environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Datagram send failed (unreachable port, interface down, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Destination host could not be resolved
    #[error("Cannot resolve {0}")]
    Resolve(String),

    /// Socket setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a resolution error for the given destination.
    pub fn resolve(destination: impl std::fmt::Display) -> Self {
        Self::Resolve(destination.to_string())
    }
}
