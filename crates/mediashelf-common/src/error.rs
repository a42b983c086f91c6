//! Common error types used throughout mediashelf.
//!
//! This module provides a unified error type covering the storage-layer
//! failure cases: not found, database errors, I/O failures and bad input.

/// Common error type for mediashelf.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
