//! Error types for cortex-core

use thiserror::Error;

/// Main error type for the cortex-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A stored event carries a type outside the known set
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

/// Result type alias for cortex-core
pub type Result<T> = std::result::Result<T, Error>;
