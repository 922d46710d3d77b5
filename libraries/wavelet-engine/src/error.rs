//! Error types for the engine adapter

use thiserror::Error;

/// Engine adapter errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The asynchronous engine connection failed
    #[error("Engine connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection was cancelled by a release
    #[error("Engine connection cancelled")]
    Cancelled,

    /// The engine rejected a command
    #[error("Engine command failed: {0}")]
    Command(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
