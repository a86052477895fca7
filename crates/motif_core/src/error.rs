//! Motion error types

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced synchronously by the animation engine
///
/// Only configuration mistakes are errors. Missing delay entries, out-of-range
/// indices, and absent platform signals resolve to documented defaults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A configuration value is out of its valid domain
    #[error("Invalid animation config: {0}")]
    InvalidConfig(String),
}

impl MotionError {
    /// Build an `InvalidConfig` error for a named field
    pub fn invalid(field: &str, value: f64) -> Self {
        MotionError::InvalidConfig(format!(
            "{} must be a finite, non-negative number of seconds (got {})",
            field, value
        ))
    }
}

/// Result type for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;

/// Validate a duration expressed in seconds
pub fn ensure_seconds(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(MotionError::invalid(field, value))
    }
}

/// Convert seconds to a `Duration`, rejecting values a `Duration` cannot hold
pub fn seconds_to_duration(field: &str, value: f64) -> Result<Duration> {
    let seconds = ensure_seconds(field, value)?;
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        MotionError::InvalidConfig(format!(
            "{} is too large to schedule (got {} seconds)",
            field, value
        ))
    })
}
