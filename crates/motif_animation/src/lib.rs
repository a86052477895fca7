//! Motif Animation
//!
//! Timing primitives built on the numeric core and the motion preference.
//!
//! # Features
//!
//! - **Stagger**: per-item delays, evenly spaced or Fibonacci weighted
//! - **Sequences**: timer-driven step playback with pause, reset, reverse and loop
//! - **Parallax**: scroll-progress offsets recomputed at most once per frame
//! - **Easing**: the curves applied to progress values
//!
//! Every controller re-reads the reduced-motion preference when it is about
//! to animate and falls back to the final or identity state when motion is
//! reduced.

pub mod easing;
pub mod parallax;
pub mod sequence;
pub mod stagger;

pub use easing::Easing;
pub use parallax::{
    evaluate, scroll_progress, transform_for, Axis, ElementGeometry, ManualGeometry, Offset,
    ParallaxConfig, ParallaxController, ParallaxState, Rect, Viewport,
};
pub use sequence::{
    plan_steps, Direction, ObserverId, ScheduledStep, SequenceConfig, SequenceController,
    StepEvent, LOOP_PAUSE,
};
pub use stagger::{compute_delays, DelayTable, StaggerConfig, Weighting, MIN_DELAY};

/// Convenient imports for hosts driving Motif animations
pub mod prelude {
    pub use crate::{
        compute_delays, Direction, Easing, ParallaxConfig, ParallaxController, SequenceConfig,
        SequenceController, StaggerConfig, StepEvent, Weighting,
    };
    pub use motif_core::{MotionPreference, PHI, PHI_INVERSE};
}
