//! Motif Platform Abstraction Layer
//!
//! This crate provides the host capabilities the animation engine depends on,
//! expressed as small traits so any event loop can drive it.
//!
//! # Architecture
//!
//! - [`TimerHost`] - one-shot timers (`setTimeout` / `clearTimeout`)
//! - [`FrameHost`] - animation-frame callbacks (`requestAnimationFrame`)
//! - [`MediaQuerySource`] - media-feature signals (`prefers-reduced-motion`)
//!
//! # Host Implementations
//!
//! - [`HeadlessHost`] - no event loop; everything degrades to a no-op
//! - [`VirtualHost`] - deterministic manual clock for tests and simulation
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use std::time::Duration;
//! use motif_platform::prelude::*;
//!
//! let host = Rc::new(VirtualHost::new());
//! host.set_media_feature("prefers-reduced-motion", "reduce");
//! assert_eq!(host.matches("(prefers-reduced-motion: reduce)"), Some(true));
//!
//! host.set_timeout(Duration::from_millis(16), Box::new(|| { /* step */ }));
//! host.advance(Duration::from_millis(16));
//! ```

mod error;
mod headless;
mod host;
mod media;
mod virtual_host;

// Re-export all public types
pub use error::{PlatformError, Result};
pub use headless::HeadlessHost;
pub use host::{
    FrameHandle, FrameHost, Host, HostCallback, ListenerId, MediaListener, MediaQuerySource,
    TimerHandle, TimerHost,
};
pub use media::MediaQuery;
pub use virtual_host::VirtualHost;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PlatformError, Result};
    pub use crate::headless::HeadlessHost;
    pub use crate::host::{
        FrameHandle, FrameHost, Host, HostCallback, ListenerId, MediaListener, MediaQuerySource,
        TimerHandle, TimerHost,
    };
    pub use crate::media::MediaQuery;
    pub use crate::virtual_host::VirtualHost;
}
