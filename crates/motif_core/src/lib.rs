//! Motif Core
//!
//! This crate provides the foundational pieces of the Motif animation engine:
//!
//! - **Numeric Core**: a lazily extended Fibonacci table and golden-ratio constants
//! - **Errors**: the configuration error taxonomy shared by every crate
//! - **Motion Preference**: the reduced-motion service every controller consults
//!
//! # Example
//!
//! ```rust
//! use motif_core::{fibonacci_at, fibonacci_range, PHI, PHI_INVERSE};
//!
//! assert_eq!(fibonacci_at(5), 8);
//! assert_eq!(fibonacci_range(2, 5), vec![2, 3, 5]);
//! assert!((PHI * PHI_INVERSE - 1.0).abs() < 1e-12);
//! ```

pub mod error;
pub mod fibonacci;
pub mod golden;
pub mod preference;

pub use error::{ensure_seconds, seconds_to_duration, MotionError, Result};
pub use fibonacci::{fibonacci_at, fibonacci_range, FibonacciTable, MAX_EXACT_INDEX};
pub use golden::{golden_compress, golden_expand, PHI, PHI_INVERSE};
pub use preference::{
    AccessibleSettings, MotionPreference, MotionSetting, SubscriberId, Subscription,
    REDUCED_DISTANCE_FACTOR, REDUCED_DURATION_FACTOR, REDUCED_MOTION_FEATURE,
    REDUCED_MOTION_QUERY,
};
