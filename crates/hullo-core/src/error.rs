//! Error types for hullo-core

use thiserror::Error;

/// Result type alias for hullo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the hullo HTTP server
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid route path
    #[error("Invalid route path: {0}")]
    InvalidPath(String),

    /// Route already registered
    #[error("Duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// Invalid listen address
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
