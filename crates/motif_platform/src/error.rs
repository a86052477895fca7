//! Platform error types

use thiserror::Error;

/// Host-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// A media query string could not be parsed
    #[error("Invalid media query: {0}")]
    InvalidMediaQuery(String),

    /// The host does not provide the requested capability
    #[error("Host capability not available: {0}")]
    Unavailable(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
