//! Scroll-driven parallax
//!
//! Maps an element's position in the viewport to a translation offset. The
//! mapping itself is the pure [`evaluate`] function; [`ParallaxController`]
//! wraps it with frame-coalesced recomputation on scroll and resize.
//!
//! The offset is `eased(progress) × range × speed`, where progress runs from
//! 0 (element below the fold) to 1 (element scrolled past the top). In golden
//! mode the range is compressed by Φ⁻¹ and the speed expanded by Φ.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use motif_core::{MotionPreference, Subscription, PHI, PHI_INVERSE};
use motif_platform::{FrameHandle, FrameHost};

use crate::easing::Easing;

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned box in viewport coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Whether any part of the box lies inside the viewport
    pub fn intersects(&self, viewport: &Viewport) -> bool {
        self.bottom() > 0.0
            && self.top() < viewport.height
            && self.right() > 0.0
            && self.left() < viewport.width
    }
}

/// Visible area of the scroll container
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Source of geometry for an observed element
pub trait ElementGeometry {
    /// Bounding box relative to the viewport, `None` when detached
    fn bounding_rect(&self) -> Option<Rect>;

    fn viewport(&self) -> Viewport;
}

/// Element geometry that is set explicitly
///
/// Used where no layout engine exists, such as simulations and tests.
#[derive(Debug, Default)]
pub struct ManualGeometry {
    rect: Cell<Option<Rect>>,
    viewport: Cell<Viewport>,
}

impl ManualGeometry {
    pub fn new(rect: Rect, viewport: Viewport) -> Self {
        Self {
            rect: Cell::new(Some(rect)),
            viewport: Cell::new(viewport),
        }
    }

    pub fn set_rect(&self, rect: Option<Rect>) {
        self.rect.set(rect);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
    }

    /// Move the element as if the container scrolled down by `dy` pixels
    pub fn scroll_by(&self, dy: f32) {
        if let Some(mut rect) = self.rect.get() {
            rect.y -= dy;
            self.rect.set(Some(rect));
        }
    }
}

impl ElementGeometry for ManualGeometry {
    fn bounding_rect(&self) -> Option<Rect> {
        self.rect.get()
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }
}

// ============================================================================
// Configuration and State
// ============================================================================

/// Axis the parallax offset is applied on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// Parallax configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParallaxConfig {
    /// Speed multiplier
    pub speed: f32,
    /// Axis of the resulting offset
    pub axis: Axis,
    /// Compress range by Φ⁻¹ and expand speed by Φ
    pub use_golden_ratio: bool,
    /// Maximum travel in pixels before speed is applied
    pub range: f32,
    /// Fraction of the element height used as its reference point
    pub offset: f32,
    /// When false the transform is always the identity
    pub enabled: bool,
    /// Curve applied to scroll progress
    pub easing: Easing,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            speed: 0.5,
            axis: Axis::Vertical,
            use_golden_ratio: true,
            range: 100.0,
            offset: 0.0,
            enabled: true,
            easing: Easing::SineInOut,
        }
    }
}

impl ParallaxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn horizontal(mut self) -> Self {
        self.axis = Axis::Horizontal;
        self
    }

    pub fn golden_ratio(mut self, enabled: bool) -> Self {
        self.use_golden_ratio = enabled;
        self
    }

    pub fn range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn effective_range(&self) -> f32 {
        if self.use_golden_ratio {
            self.range * PHI_INVERSE as f32
        } else {
            self.range
        }
    }

    pub fn effective_speed(&self) -> f32 {
        if self.use_golden_ratio {
            self.speed * PHI as f32
        } else {
            self.speed
        }
    }
}

/// A 2D translation in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn along(axis: Axis, magnitude: f32) -> Self {
        match axis {
            Axis::Vertical => Self::new(0.0, magnitude),
            Axis::Horizontal => Self::new(magnitude, 0.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl fmt::Display for Offset {
    /// Formats as a CSS transform
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translate3d({}px, {}px, 0)", self.x, self.y)
    }
}

/// Output of a parallax evaluation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParallaxState {
    pub transform: Offset,
    /// Scroll progress in 0.0..=1.0
    pub progress: f32,
    pub in_view: bool,
}

impl ParallaxState {
    /// Zero offset, zero progress
    pub fn identity() -> Self {
        Self::default()
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Scroll progress of an element through the viewport
pub fn scroll_progress(rect: &Rect, viewport: &Viewport, offset: f32) -> f32 {
    if viewport.height <= 0.0 {
        return 0.0;
    }
    let reference = rect.top() + rect.height * offset;
    (1.0 - reference / viewport.height).clamp(0.0, 1.0)
}

/// Offset for a given scroll progress
pub fn transform_for(config: &ParallaxConfig, progress: f32) -> Offset {
    let value = config.easing.apply(progress);
    let magnitude = value * config.effective_range() * config.effective_speed();
    Offset::along(config.axis, magnitude)
}

/// Compute the next parallax state
///
/// Disabled or reduced-motion evaluation returns the identity. An element
/// outside the viewport keeps its previous transform and progress.
pub fn evaluate(
    config: &ParallaxConfig,
    rect: &Rect,
    viewport: &Viewport,
    previous: ParallaxState,
    reduced_motion: bool,
) -> ParallaxState {
    let in_view = rect.intersects(viewport);

    if !config.enabled || reduced_motion {
        return ParallaxState {
            in_view,
            ..ParallaxState::identity()
        };
    }

    if !in_view {
        return ParallaxState {
            in_view: false,
            ..previous
        };
    }

    let progress = scroll_progress(rect, viewport, config.offset);
    ParallaxState {
        transform: transform_for(config, progress),
        progress,
        in_view: true,
    }
}

// ============================================================================
// Controller
// ============================================================================

struct ParallaxInner {
    host: Rc<dyn FrameHost>,
    element: Rc<dyn ElementGeometry>,
    preference: MotionPreference,
    config: ParallaxConfig,
    state: ParallaxState,
    pending_frame: Option<FrameHandle>,
    recomputes: u64,
}

/// Recomputes a parallax offset on scroll and resize
///
/// Notifications only request an animation frame; any number of them
/// before the frame runs produce a single recomputation.
pub struct ParallaxController {
    inner: Rc<RefCell<ParallaxInner>>,
    _preference_subscription: Subscription,
}

impl ParallaxController {
    /// Create a controller and compute the initial state immediately
    pub fn new(
        host: Rc<dyn FrameHost>,
        element: Rc<dyn ElementGeometry>,
        preference: MotionPreference,
        config: ParallaxConfig,
    ) -> Self {
        let inner = Rc::new(RefCell::new(ParallaxInner {
            host,
            element,
            preference: preference.clone(),
            config,
            state: ParallaxState::identity(),
            pending_frame: None,
            recomputes: 0,
        }));

        let weak = Rc::downgrade(&inner);
        let subscription = preference.subscribe(move |reduced| {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("ParallaxController: reduced motion changed to {}", reduced);
                request_update(&inner);
            }
        });

        recompute(&inner);

        Self {
            inner,
            _preference_subscription: subscription,
        }
    }

    /// Notify the controller that its container scrolled
    pub fn on_scroll(&self) {
        request_update(&self.inner);
    }

    /// Notify the controller that the viewport or element resized
    pub fn on_resize(&self) {
        request_update(&self.inner);
    }

    /// Replace the configuration and schedule a recomputation
    pub fn set_config(&self, config: ParallaxConfig) {
        self.inner.borrow_mut().config = config;
        request_update(&self.inner);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let config = self.config().enabled(enabled);
        self.set_config(config);
    }

    pub fn config(&self) -> ParallaxConfig {
        self.inner.borrow().config
    }

    pub fn state(&self) -> ParallaxState {
        self.inner.borrow().state
    }

    pub fn transform(&self) -> Offset {
        self.state().transform
    }

    pub fn progress(&self) -> f32 {
        self.state().progress
    }

    pub fn in_view(&self) -> bool {
        self.state().in_view
    }

    /// Whether a recomputation is waiting for the next frame
    pub fn has_pending_frame(&self) -> bool {
        self.inner.borrow().pending_frame.is_some()
    }

    /// Number of recomputations performed so far
    pub fn recompute_count(&self) -> u64 {
        self.inner.borrow().recomputes
    }
}

impl fmt::Debug for ParallaxController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ParallaxController")
            .field("config", &inner.config)
            .field("state", &inner.state)
            .field("pending_frame", &inner.pending_frame.is_some())
            .finish()
    }
}

impl Drop for ParallaxController {
    fn drop(&mut self) {
        let (host, pending) = {
            let mut inner = self.inner.borrow_mut();
            (Rc::clone(&inner.host), inner.pending_frame.take())
        };
        if let Some(handle) = pending {
            host.cancel_frame(handle);
        }
    }
}

fn request_update(inner: &Rc<RefCell<ParallaxInner>>) {
    let host = {
        let guard = inner.borrow();
        if guard.pending_frame.is_some() {
            tracing::trace!("ParallaxController: update coalesced into pending frame");
            return;
        }
        Rc::clone(&guard.host)
    };

    let weak = Rc::downgrade(inner);
    let handle = host.request_frame(Box::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.borrow_mut().pending_frame = None;
            recompute(&inner);
        }
    }));
    inner.borrow_mut().pending_frame = Some(handle);
}

fn recompute(inner: &Rc<RefCell<ParallaxInner>>) {
    let (element, preference) = {
        let guard = inner.borrow();
        (Rc::clone(&guard.element), guard.preference.clone())
    };

    // Geometry and preference are read before taking the state borrow
    let rect = element.bounding_rect();
    let viewport = element.viewport();
    let reduced = preference.prefers_reduced_motion();

    let mut guard = inner.borrow_mut();
    let previous = guard.state;
    guard.state = match rect {
        Some(rect) => evaluate(&guard.config, &rect, &viewport, previous, reduced),
        None => ParallaxState {
            in_view: false,
            ..previous
        },
    };
    guard.recomputes += 1;

    tracing::trace!(
        "ParallaxController: progress {:.3}, transform {}, in_view {}",
        guard.state.progress,
        guard.state.transform,
        guard.state.in_view
    );
}
