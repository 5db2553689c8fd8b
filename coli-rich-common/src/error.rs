//! Common error types for coli-rich

use thiserror::Error;

/// Common result type for coli-rich operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the store, configuration and credential handling
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested enrichment does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identifier contains characters outside `[A-Za-z0-9]`
    #[error("Invalid enrichment id: {0:?}")]
    InvalidId(String),

    /// Bearer credential missing, malformed or failing verification
    #[error("Credential error: {0}")]
    Credential(String),
}
