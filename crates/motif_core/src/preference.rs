//! Reduced-motion preference service
//!
//! Wraps the host's `prefers-reduced-motion` media feature. Every consumer
//! re-reads the preference when it is about to animate instead of caching it,
//! and consumers that need to react immediately subscribe for changes.
//!
//! The service is reference counted: the first [`Subscription`] attaches a
//! single platform listener and dropping the last one detaches it, no matter
//! how many consumers share the service.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use motif_core::MotionPreference;
//! use motif_platform::VirtualHost;
//!
//! let host = Rc::new(VirtualHost::new());
//! let preference = MotionPreference::new(host.clone());
//!
//! let _sub = preference.subscribe(|reduced| println!("reduced motion: {}", reduced));
//! host.set_media_feature("prefers-reduced-motion", "reduce");
//! assert!(preference.prefers_reduced_motion());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use motif_platform::{HeadlessHost, ListenerId, MediaQuerySource};
use slotmap::{new_key_type, SlotMap};

/// Media feature name of the reduced-motion signal
pub const REDUCED_MOTION_FEATURE: &str = "prefers-reduced-motion";

/// Query that matches when the user asked for reduced motion
pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

/// Duration multiplier applied under reduced motion
pub const REDUCED_DURATION_FACTOR: f64 = 0.5;

/// Distance multiplier applied under reduced motion
pub const REDUCED_DISTANCE_FACTOR: f64 = 0.3;

new_key_type! {
    /// Handle to a preference subscriber
    pub struct SubscriberId;
}

/// Values of the `prefers-reduced-motion` media feature
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MotionSetting {
    #[default]
    NoPreference,
    Reduce,
}

impl MotionSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionSetting::NoPreference => "no-preference",
            MotionSetting::Reduce => "reduce",
        }
    }

    pub fn from_reduced(reduced: bool) -> Self {
        if reduced {
            MotionSetting::Reduce
        } else {
            MotionSetting::NoPreference
        }
    }
}

impl fmt::Display for MotionSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animation parameters adjusted for the motion preference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccessibleSettings {
    /// Duration in seconds
    pub duration: f64,
    /// Travel distance in pixels
    pub distance: f64,
    /// Whether the element should animate at all
    pub should_animate: bool,
}

impl AccessibleSettings {
    /// Resolve standard values against a known preference
    pub fn resolve(reduced: bool, duration: f64, distance: f64) -> Self {
        if reduced {
            Self {
                duration: duration * REDUCED_DURATION_FACTOR,
                distance: distance * REDUCED_DISTANCE_FACTOR,
                should_animate: false,
            }
        } else {
            Self {
                duration,
                distance,
                should_animate: true,
            }
        }
    }
}

struct PreferenceInner {
    source: Rc<dyn MediaQuerySource>,
    /// Platform listener, present while at least one subscriber exists
    listener: Option<ListenerId>,
    subscribers: SlotMap<SubscriberId, Rc<dyn Fn(bool)>>,
}

impl Drop for PreferenceInner {
    fn drop(&mut self) {
        if let Some(id) = self.listener.take() {
            self.source.remove_listener(id);
        }
    }
}

/// Shared handle to the reduced-motion preference
///
/// Cloning is cheap; clones observe the same signal and share subscribers.
#[derive(Clone)]
pub struct MotionPreference {
    inner: Rc<RefCell<PreferenceInner>>,
}

impl MotionPreference {
    /// Create a preference service over a media-query source
    pub fn new(source: Rc<dyn MediaQuerySource>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PreferenceInner {
                source,
                listener: None,
                subscribers: SlotMap::with_key(),
            })),
        }
    }

    /// A preference with no platform signal (always allows motion)
    pub fn headless() -> Self {
        Self::new(Rc::new(HeadlessHost::new()))
    }

    /// Whether the user asked for reduced motion
    ///
    /// Reads the platform signal on every call. When the host has no such
    /// signal this returns `false`, so motion stays enabled.
    pub fn prefers_reduced_motion(&self) -> bool {
        let source = Rc::clone(&self.inner.borrow().source);
        match source.matches(REDUCED_MOTION_QUERY) {
            Some(reduced) => reduced,
            None => {
                tracing::trace!("MotionPreference: no platform signal, motion allowed");
                false
            }
        }
    }

    /// Current value of the media feature
    pub fn setting(&self) -> MotionSetting {
        MotionSetting::from_reduced(self.prefers_reduced_motion())
    }

    /// Adjust a standard duration (seconds) and distance (pixels)
    pub fn accessible_settings(&self, duration: f64, distance: f64) -> AccessibleSettings {
        AccessibleSettings::resolve(self.prefers_reduced_motion(), duration, distance)
    }

    /// Adjust a scale factor; reduced motion disables scaling
    pub fn accessible_scale(&self, scale: f64) -> f64 {
        if self.prefers_reduced_motion() {
            1.0
        } else {
            scale
        }
    }

    /// Subscribe to preference changes
    ///
    /// The callback runs synchronously whenever the platform signal changes.
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + 'static,
    {
        let id = self.inner.borrow_mut().subscribers.insert(Rc::new(callback));
        self.attach();

        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Whether a platform listener is currently attached
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().listener.is_some()
    }

    fn attach(&self) {
        let source = {
            let inner = self.inner.borrow();
            if inner.listener.is_some() {
                return;
            }
            Rc::clone(&inner.source)
        };

        let weak = Rc::downgrade(&self.inner);
        let listener = Rc::new(move |reduced: bool| {
            if let Some(inner) = weak.upgrade() {
                notify(&inner, reduced);
            }
        });

        match source.add_listener(REDUCED_MOTION_QUERY, listener) {
            Ok(id) => {
                tracing::debug!("MotionPreference: attached platform listener");
                self.inner.borrow_mut().listener = Some(id);
            }
            Err(err) => {
                tracing::debug!("MotionPreference: change notifications unavailable: {}", err);
            }
        }
    }
}

impl fmt::Debug for MotionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MotionPreference")
            .field("attached", &inner.listener.is_some())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

fn notify(inner: &Rc<RefCell<PreferenceInner>>, reduced: bool) {
    // Subscribers may subscribe or unsubscribe while being notified
    let subscribers: Vec<Rc<dyn Fn(bool)>> = inner.borrow().subscribers.values().cloned().collect();

    tracing::debug!(
        "MotionPreference: {} -> {} subscriber(s)",
        MotionSetting::from_reduced(reduced),
        subscribers.len()
    );

    for subscriber in subscribers {
        subscriber(reduced);
    }
}

/// Guard returned by [`MotionPreference::subscribe`]
///
/// Dropping the last subscription detaches the platform listener.
pub struct Subscription {
    inner: Weak<RefCell<PreferenceInner>>,
    id: SubscriberId,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        let detach = {
            let mut guard = inner.borrow_mut();
            guard.subscribers.remove(self.id);
            if guard.subscribers.is_empty() {
                guard
                    .listener
                    .take()
                    .map(|id| (Rc::clone(&guard.source), id))
            } else {
                None
            }
        };

        if let Some((source, id)) = detach {
            source.remove_listener(id);
            tracing::debug!("MotionPreference: detached platform listener");
        }
    }
}
