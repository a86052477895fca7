//! Deterministic virtual host
//!
//! Time only moves when [`VirtualHost::advance`] is called, frames only run
//! when [`VirtualHost::run_frames`] is called, and media features are set
//! explicitly. This makes timer-driven sequences reproducible in tests and in
//! the CLI simulator.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use motif_platform::{TimerHost, VirtualHost};
//!
//! let host = VirtualHost::new();
//! host.set_timeout(Duration::from_millis(100), Box::new(|| println!("fired")));
//! assert_eq!(host.advance(Duration::from_millis(100)), 1);
//! ```

use std::cell::RefCell;
use std::time::Duration;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::error::Result;
use crate::host::{
    FrameHandle, FrameHost, HostCallback, ListenerId, MediaListener, MediaQuerySource,
    TimerHandle, TimerHost,
};
use crate::media::MediaQuery;

struct PendingTimer {
    fire_at: Duration,
    /// Insertion order, breaks ties between timers due at the same instant
    seq: u64,
    callback: HostCallback,
}

struct PendingFrame {
    seq: u64,
    callback: HostCallback,
}

struct RegisteredListener {
    query: MediaQuery,
    listener: MediaListener,
    last: Option<bool>,
}

#[derive(Default)]
struct VirtualInner {
    now: Duration,
    next_seq: u64,
    timers: SlotMap<TimerHandle, PendingTimer>,
    frames: SlotMap<FrameHandle, PendingFrame>,
    features: FxHashMap<String, String>,
    listeners: SlotMap<ListenerId, RegisteredListener>,
    frames_run: u64,
}

impl VirtualInner {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn evaluate(&self, query: &MediaQuery) -> Option<bool> {
        self.features
            .get(query.feature())
            .map(|current| query.matches_value(current))
    }

    /// Remove and return the earliest timer due at or before `deadline`
    fn pop_due(&mut self, deadline: Duration) -> Option<PendingTimer> {
        let id = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.fire_at <= deadline)
            .min_by_key(|(_, timer)| (timer.fire_at, timer.seq))
            .map(|(id, _)| id)?;
        self.timers.remove(id)
    }
}

/// A single-threaded host driven by a manual clock
#[derive(Default)]
pub struct VirtualHost {
    inner: RefCell<VirtualInner>,
}

impl VirtualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the host was created
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Advance the clock by `dt`, firing every timer that comes due
    ///
    /// Timers fire in deadline order; timers scheduled by a callback fire in
    /// the same call if they fall inside the window. Returns the number of
    /// timers fired.
    pub fn advance(&self, dt: Duration) -> usize {
        let deadline = self.inner.borrow().now + dt;
        let mut fired = 0;

        loop {
            // The borrow must end before the callback runs: callbacks schedule
            // and clear timers on this same host.
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner.pop_due(deadline).map(|timer| {
                    inner.now = timer.fire_at.max(inner.now);
                    timer.callback
                })
            };

            match next {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        self.inner.borrow_mut().now = deadline;
        fired
    }

    /// Advance the clock until no timers remain, up to `limit`
    ///
    /// Returns the number of timers fired. Looping schedules never drain, so
    /// the limit bounds how far the clock may move.
    pub fn run_until_idle(&self, limit: Duration) -> usize {
        let start = self.now();
        let mut fired = 0;

        while let Some(next_at) = self.next_deadline() {
            if next_at > start + limit {
                break;
            }
            fired += self.advance(next_at.saturating_sub(self.now()));
        }

        fired
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner
            .borrow()
            .timers
            .values()
            .map(|timer| timer.fire_at)
            .min()
    }

    /// Number of timers that have not fired or been cleared
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// Run every frame callback requested before this call
    ///
    /// Callbacks requested while the batch runs wait for the next call, as
    /// they would wait for the next display frame. Returns the number run.
    pub fn run_frames(&self) -> usize {
        let batch: Vec<PendingFrame> = {
            let mut inner = self.inner.borrow_mut();
            inner.frames_run += 1;
            let mut batch: Vec<PendingFrame> = inner.frames.drain().map(|(_, f)| f).collect();
            batch.sort_by_key(|frame| frame.seq);
            batch
        };

        let count = batch.len();
        for frame in batch {
            (frame.callback)();
        }
        count
    }

    /// Number of frame callbacks waiting for the next frame
    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Number of times [`run_frames`](Self::run_frames) has been called
    pub fn frames_run(&self) -> u64 {
        self.inner.borrow().frames_run
    }

    /// Set a media feature, notifying listeners whose match state changed
    pub fn set_media_feature(&self, feature: &str, value: &str) {
        self.update_features(feature, |features| {
            features.insert(feature.to_ascii_lowercase(), value.to_ascii_lowercase());
        });
    }

    /// Remove a media feature so queries on it report no signal
    ///
    /// Listeners that matched are told the query no longer matches.
    pub fn clear_media_feature(&self, feature: &str) {
        self.update_features(feature, |features| {
            features.remove(&feature.to_ascii_lowercase());
        });
    }

    /// Apply `update` to the feature map, then notify listeners whose match
    /// state changed
    fn update_features(&self, feature: &str, update: impl FnOnce(&mut FxHashMap<String, String>)) {
        let notify: Vec<(MediaListener, bool)> = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            update(&mut inner.features);

            let mut changed = Vec::new();
            let features = &inner.features;
            for (_, registered) in inner.listeners.iter_mut() {
                let now = features
                    .get(registered.query.feature())
                    .map(|current| registered.query.matches_value(current));
                if now != registered.last {
                    // A vanished signal reads as "does not match"
                    let was_matching = registered.last.unwrap_or(false);
                    let matches = now.unwrap_or(false);
                    registered.last = now;
                    if matches != was_matching || now.is_some() {
                        changed.push((registered.listener.clone(), matches));
                    }
                }
            }
            changed
        };

        tracing::debug!(
            "VirtualHost: {} updated ({} listener(s) notified)",
            feature,
            notify.len()
        );

        for (listener, matches) in notify {
            listener(matches);
        }
    }

    /// Number of registered media-query listeners
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl TimerHost for VirtualHost {
    fn set_timeout(&self, delay: Duration, callback: HostCallback) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        let fire_at = inner.now + delay;
        let seq = inner.next_seq();
        inner.timers.insert(PendingTimer {
            fire_at,
            seq,
            callback,
        })
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.inner.borrow_mut().timers.remove(handle);
    }
}

impl FrameHost for VirtualHost {
    fn request_frame(&self, callback: HostCallback) -> FrameHandle {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_seq();
        inner.frames.insert(PendingFrame { seq, callback })
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.inner.borrow_mut().frames.remove(handle);
    }
}

impl MediaQuerySource for VirtualHost {
    fn matches(&self, query: &str) -> Option<bool> {
        let query: MediaQuery = match query.parse() {
            Ok(query) => query,
            Err(err) => {
                tracing::warn!("VirtualHost: {}", err);
                return None;
            }
        };
        self.inner.borrow().evaluate(&query)
    }

    fn add_listener(&self, query: &str, listener: MediaListener) -> Result<ListenerId> {
        let query: MediaQuery = query.parse()?;
        let mut inner = self.inner.borrow_mut();
        let last = inner.evaluate(&query);
        Ok(inner.listeners.insert(RegisteredListener {
            query,
            listener,
            last,
        }))
    }

    fn remove_listener(&self, id: ListenerId) {
        self.inner.borrow_mut().listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let host = Rc::new(VirtualHost::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, ms) in [("c", 300), ("a", 100), ("b", 200), ("a2", 100)] {
            let log = log.clone();
            host.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push(label)),
            );
        }

        assert_eq!(host.advance(Duration::from_millis(150)), 2);
        assert_eq!(*log.borrow(), vec!["a", "a2"]);
        assert_eq!(host.now(), Duration::from_millis(150));

        assert_eq!(host.advance(Duration::from_millis(1000)), 2);
        assert_eq!(*log.borrow(), vec!["a", "a2", "b", "c"]);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_cleared_timer_never_fires() {
        let host = VirtualHost::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();

        let handle = host.set_timeout(Duration::from_millis(10), Box::new(move || flag.set(true)));
        host.clear_timeout(handle);
        host.advance(Duration::from_secs(1));

        assert!(!fired.get());
    }

    #[test]
    fn test_callback_can_schedule_more_timers() {
        let host = Rc::new(VirtualHost::new());
        let count = Rc::new(Cell::new(0));

        let inner_host = host.clone();
        let inner_count = count.clone();
        host.set_timeout(
            Duration::from_millis(10),
            Box::new(move || {
                inner_count.set(inner_count.get() + 1);
                let nested = inner_count.clone();
                inner_host.set_timeout(
                    Duration::from_millis(10),
                    Box::new(move || nested.set(nested.get() + 1)),
                );
            }),
        );

        assert_eq!(host.advance(Duration::from_millis(25)), 2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_run_until_idle_respects_limit() {
        let host = VirtualHost::new();
        host.set_timeout(Duration::from_millis(50), Box::new(|| {}));
        host.set_timeout(Duration::from_secs(10), Box::new(|| {}));

        assert_eq!(host.run_until_idle(Duration::from_secs(1)), 1);
        assert_eq!(host.pending_timers(), 1);
        assert_eq!(host.next_deadline(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_frames_run_in_batches() {
        let host = Rc::new(VirtualHost::new());
        let count = Rc::new(Cell::new(0));

        let c = count.clone();
        let h = host.clone();
        host.request_frame(Box::new(move || {
            c.set(c.get() + 1);
            let c2 = c.clone();
            h.request_frame(Box::new(move || c2.set(c2.get() + 1)));
        }));

        assert_eq!(host.run_frames(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(host.pending_frames(), 1);
        assert_eq!(host.run_frames(), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(host.frames_run(), 2);
    }

    #[test]
    fn test_media_listener_notified_on_change_only() {
        let host = VirtualHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        assert_eq!(host.matches("(prefers-reduced-motion: reduce)"), None);

        let s = seen.clone();
        let id = host
            .add_listener(
                "(prefers-reduced-motion: reduce)",
                Rc::new(move |m| s.borrow_mut().push(m)),
            )
            .unwrap();

        host.set_media_feature("prefers-reduced-motion", "reduce");
        host.set_media_feature("prefers-reduced-motion", "reduce");
        host.set_media_feature("prefers-reduced-motion", "no-preference");

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert_eq!(host.matches("(prefers-reduced-motion: reduce)"), Some(false));

        host.remove_listener(id);
        assert_eq!(host.listener_count(), 0);
        host.set_media_feature("prefers-reduced-motion", "reduce");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_clearing_feature_notifies_and_resets_state() {
        let host = VirtualHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        host.add_listener(
            "(prefers-reduced-motion: reduce)",
            Rc::new(move |m| s.borrow_mut().push(m)),
        )
        .unwrap();

        host.set_media_feature("prefers-reduced-motion", "reduce");
        host.clear_media_feature("prefers-reduced-motion");
        assert_eq!(host.matches("(prefers-reduced-motion: reduce)"), None);

        // A later change is not swallowed by stale state
        host.set_media_feature("prefers-reduced-motion", "reduce");
        assert_eq!(*seen.borrow(), vec![true, false, true]);

        // Clearing a feature that did not match stays silent
        host.set_media_feature("prefers-reduced-motion", "no-preference");
        host.clear_media_feature("prefers-reduced-motion");
        assert_eq!(*seen.borrow(), vec![true, false, true, false]);
    }

    #[test]
    fn test_invalid_query_reports_no_signal() {
        let host = VirtualHost::new();
        host.set_media_feature("prefers-reduced-motion", "reduce");
        assert_eq!(host.matches("prefers-reduced-motion"), None);
        assert!(host.add_listener("nonsense", Rc::new(|_| {})).is_err());
    }
}
