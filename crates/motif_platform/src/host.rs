//! Host capability traits
//!
//! A host is whatever drives the animation engine: a browser-like event loop,
//! a native windowing loop, or a test clock. The engine only ever needs three
//! capabilities from it, each behind its own trait so callers can hand a
//! controller exactly what it uses.

use std::rc::Rc;
use std::time::Duration;

use slotmap::new_key_type;

use crate::error::Result;

new_key_type! {
    /// Handle to a pending timer
    pub struct TimerHandle;
    /// Handle to a pending animation-frame callback
    pub struct FrameHandle;
    /// Handle to a registered media-query listener
    pub struct ListenerId;
}

/// Callback invoked once when a timer or frame fires
pub type HostCallback = Box<dyn FnOnce()>;

/// Listener notified with the new match state of a media query
pub type MediaListener = Rc<dyn Fn(bool)>;

/// One-shot timers (the `setTimeout`/`clearTimeout` pair)
pub trait TimerHost {
    /// Schedule `callback` to run once after `delay`
    fn set_timeout(&self, delay: Duration, callback: HostCallback) -> TimerHandle;

    /// Cancel a pending timer
    ///
    /// Clearing a timer that already fired or was never scheduled is a no-op.
    fn clear_timeout(&self, handle: TimerHandle);

    /// Whether timers scheduled on this host will ever fire
    ///
    /// Hosts without a real event loop return `false` so callers can skip
    /// straight to their final state instead of waiting forever.
    fn supports_timers(&self) -> bool {
        true
    }
}

/// Animation-frame scheduling (the `requestAnimationFrame` pair)
pub trait FrameHost {
    /// Run `callback` once before the next frame is produced
    fn request_frame(&self, callback: HostCallback) -> FrameHandle;

    /// Cancel a pending frame callback
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Source of media-feature signals such as `prefers-reduced-motion`
pub trait MediaQuerySource {
    /// Current match state of `query`, or `None` when the host has no such signal
    fn matches(&self, query: &str) -> Option<bool>;

    /// Register a listener called whenever the match state of `query` changes
    fn add_listener(&self, query: &str, listener: MediaListener) -> Result<ListenerId>;

    /// Remove a previously registered listener
    fn remove_listener(&self, id: ListenerId);
}

/// A host providing every capability the engine uses
pub trait Host: TimerHost + FrameHost + MediaQuerySource {}

impl<T: TimerHost + FrameHost + MediaQuerySource> Host for T {}
