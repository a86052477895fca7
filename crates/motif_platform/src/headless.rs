//! Headless host
//!
//! Used when there is no event loop at all (server-side rendering, plain unit
//! tests, tooling). Every capability degrades to a no-op: timers and frames
//! never fire, and no media signal exists.

use std::time::Duration;

use crate::error::{PlatformError, Result};
use crate::host::{
    FrameHandle, FrameHost, HostCallback, ListenerId, MediaListener, MediaQuerySource,
    TimerHandle, TimerHost,
};

/// A host with no timers, frames, or media signals
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessHost;

impl HeadlessHost {
    pub fn new() -> Self {
        Self
    }
}

impl TimerHost for HeadlessHost {
    fn set_timeout(&self, delay: Duration, _callback: HostCallback) -> TimerHandle {
        tracing::trace!("HeadlessHost: dropping timer ({:?})", delay);
        TimerHandle::default()
    }

    fn clear_timeout(&self, _handle: TimerHandle) {}

    fn supports_timers(&self) -> bool {
        false
    }
}

impl FrameHost for HeadlessHost {
    fn request_frame(&self, _callback: HostCallback) -> FrameHandle {
        FrameHandle::default()
    }

    fn cancel_frame(&self, _handle: FrameHandle) {}
}

impl MediaQuerySource for HeadlessHost {
    fn matches(&self, _query: &str) -> Option<bool> {
        None
    }

    fn add_listener(&self, query: &str, _listener: MediaListener) -> Result<ListenerId> {
        Err(PlatformError::Unavailable(format!("media query {}", query)))
    }

    fn remove_listener(&self, _id: ListenerId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;
    use std::rc::Rc;

    #[test]
    fn test_headless_degrades_to_noops() {
        let host = HeadlessHost::new();

        assert!(!host.supports_timers());
        let handle = host.set_timeout(Duration::from_millis(10), Box::new(|| panic!("fired")));
        assert!(handle.is_null());
        host.clear_timeout(handle);

        assert!(host.request_frame(Box::new(|| panic!("fired"))).is_null());
        assert_eq!(host.matches("(prefers-reduced-motion: reduce)"), None);
        assert!(host
            .add_listener("(prefers-reduced-motion: reduce)", Rc::new(|_| {}))
            .is_err());
    }
}
