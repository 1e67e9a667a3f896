//! Common error types for RoadIt

use thiserror::Error;

use crate::model::Status;

/// Common result type for RoadIt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across RoadIt crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Status change rejected by the active transition policy
    #[error("Transition from \"{from}\" to \"{to}\" is not allowed")]
    InvalidTransition { from: Status, to: Status },

    /// Persisted slot could not be written
    #[error("Storage error: {0}")]
    Storage(String),
}
