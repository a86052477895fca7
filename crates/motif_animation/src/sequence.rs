//! Animation sequence controller
//!
//! Drives a staggered reveal: given N steps it computes a delay table, turns
//! it into an explicit ordered plan of `(fire_at, step)` pairs, and schedules
//! one host timer per pair. Each timer moves `current_step` forward (or
//! backward for [`Direction::Reverse`]).
//!
//! The controller owns every pending timer handle. `play`, `pause`, `reset`
//! and dropping the controller all clear them before anything else happens,
//! so two schedules never overlap and nothing fires after teardown.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use std::time::Duration;
//! use motif_animation::{SequenceConfig, SequenceController};
//! use motif_core::MotionPreference;
//! use motif_platform::VirtualHost;
//!
//! let host = Rc::new(VirtualHost::new());
//! let sequence = SequenceController::new(host.clone(), MotionPreference::new(host.clone()));
//!
//! sequence.play(&SequenceConfig::new(5).base_delay(0.1))?;
//! host.advance(Duration::from_secs(1));
//! assert_eq!(sequence.current_step(), Some(4));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use motif_core::{ensure_seconds, seconds_to_duration, MotionPreference, Result};
use motif_platform::{TimerHandle, TimerHost};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::stagger::{compute_delays, DelayTable, StaggerConfig, Weighting};

/// Pause between the last step of a cycle and the first step of the next
pub const LOOP_PAUSE: Duration = Duration::from_secs(1);

new_key_type! {
    /// Handle to a registered step observer
    pub struct ObserverId;
}

/// Order in which steps are revealed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Step 0 first, step N-1 last
    #[default]
    Forward,
    /// Step N-1 first, step 0 last
    Reverse,
}

impl Direction {
    /// Step revealed at `position` in a sequence of `total` steps
    pub fn step_at(self, position: usize, total: usize) -> usize {
        match self {
            Direction::Forward => position,
            Direction::Reverse => total.saturating_sub(1).saturating_sub(position),
        }
    }

    /// Step revealed last
    pub fn final_step(self, total: usize) -> usize {
        self.step_at(total.saturating_sub(1), total)
    }
}

/// Configuration passed to [`SequenceController::play`]
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceConfig {
    /// Number of steps to reveal
    pub total_steps: usize,
    /// Base delay between steps (seconds); also the fallback for missing entries
    pub base_delay: f64,
    /// Optional budget for the whole stagger (seconds)
    pub total_duration: Option<f64>,
    /// Distribution of step delays
    pub weighting: Weighting,
    /// Delay before the first step (seconds)
    pub initial_delay: f64,
    /// Reveal order
    pub direction: Direction,
    /// Restart after [`LOOP_PAUSE`] once the last step fires
    pub looping: bool,
}

impl SequenceConfig {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            base_delay: 0.1,
            total_duration: None,
            weighting: Weighting::Linear,
            initial_delay: 0.0,
            direction: Direction::Forward,
            looping: false,
        }
    }

    pub fn base_delay(mut self, seconds: f64) -> Self {
        self.base_delay = seconds;
        self
    }

    pub fn total_duration(mut self, seconds: f64) -> Self {
        self.total_duration = Some(seconds);
        self
    }

    pub fn fibonacci(mut self) -> Self {
        self.weighting = Weighting::Fibonacci;
        self
    }

    pub fn initial_delay(mut self, seconds: f64) -> Self {
        self.initial_delay = seconds;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn reverse(self) -> Self {
        self.direction(Direction::Reverse)
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Stagger configuration for this sequence
    pub fn stagger(&self, reduced_motion: bool) -> StaggerConfig {
        StaggerConfig {
            item_count: self.total_steps,
            base_delay: self.base_delay,
            total_duration: self.total_duration,
            weighting: self.weighting,
            reduced_motion,
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// One entry of a sequence plan
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledStep {
    /// Offset from `play()` at which the step fires
    pub fire_at: Duration,
    /// Step index revealed
    pub step: usize,
}

/// Build the ordered plan for a sequence
///
/// Each step fires at the initial delay plus the delays of every step before
/// it. A missing delay entry falls back to `config.base_delay`. Fails when an
/// offset is too large to represent as a `Duration`.
pub fn plan_steps(config: &SequenceConfig, delays: &DelayTable) -> Result<Vec<ScheduledStep>> {
    let total = config.total_steps;
    let mut offset = config.initial_delay;

    (0..total)
        .map(|position| -> Result<ScheduledStep> {
            let scheduled = ScheduledStep {
                fire_at: seconds_to_duration("step offset", offset)?,
                step: config.direction.step_at(position, total),
            };
            offset += delays.get_or(position, config.base_delay);
            Ok(scheduled)
        })
        .collect()
}

/// Notification sent to observers when a step is revealed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepEvent {
    /// Step index now current
    pub step: usize,
    /// Position of this step in the plan
    pub position: usize,
    /// Loop cycle, starting at 0
    pub cycle: u32,
    /// Whether this is the last step of the cycle
    pub is_final: bool,
}

type StepObserver = Rc<dyn Fn(&StepEvent)>;

/// What a pending timer will do when it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerSlot {
    Step(usize),
    LoopRestart,
}

struct SequenceInner {
    host: Rc<dyn TimerHost>,
    preference: MotionPreference,
    current: Option<usize>,
    playing: bool,
    direction: Direction,
    looping: bool,
    cycle: u32,
    plan: Vec<ScheduledStep>,
    delays: DelayTable,
    pending: SmallVec<[(TimerSlot, TimerHandle); 8]>,
    observers: SlotMap<ObserverId, StepObserver>,
}

impl SequenceInner {
    fn observers(&self) -> Vec<StepObserver> {
        self.observers.values().cloned().collect()
    }
}

/// Timer-driven step sequencer for staggered reveals
///
/// Not `Clone`: the controller is the single owner of its timers, and
/// dropping it cancels all of them.
pub struct SequenceController {
    inner: Rc<RefCell<SequenceInner>>,
}

impl SequenceController {
    pub fn new(host: Rc<dyn TimerHost>, preference: MotionPreference) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SequenceInner {
                host,
                preference,
                current: None,
                playing: false,
                direction: Direction::Forward,
                looping: false,
                cycle: 0,
                plan: Vec::new(),
                delays: DelayTable::default(),
                pending: SmallVec::new(),
                observers: SlotMap::with_key(),
            })),
        }
    }

    /// Start the sequence from the beginning
    ///
    /// Any schedule already in flight is cancelled first. Under reduced motion,
    /// or on a host whose timers never fire, the sequence jumps straight to its
    /// final step without scheduling anything.
    ///
    /// Configuration errors are reported before the running schedule is touched.
    pub fn play(&self, config: &SequenceConfig) -> Result<()> {
        ensure_seconds("initial_delay", config.initial_delay)?;

        let (preference, supports_timers) = {
            let inner = self.inner.borrow();
            (inner.preference.clone(), inner.host.supports_timers())
        };
        let reduced = preference.prefers_reduced_motion();
        let delays = compute_delays(&config.stagger(reduced))?;
        let plan = plan_steps(config, &delays)?;

        cancel_pending(&self.inner);

        let total = config.total_steps;
        {
            let mut inner = self.inner.borrow_mut();
            inner.current = None;
            inner.playing = false;
            inner.direction = config.direction;
            inner.looping = config.looping;
            inner.cycle = 0;
            inner.plan = plan;
            inner.delays = delays;
        }

        if total == 0 {
            tracing::debug!("SequenceController: nothing to play");
            return Ok(());
        }

        if reduced || !supports_timers {
            tracing::debug!(
                "SequenceController: jumping to final step (reduced_motion={}, timers={})",
                reduced,
                supports_timers
            );
            jump_to_final(&self.inner);
            return Ok(());
        }

        tracing::debug!(
            "SequenceController: playing {} step(s) {:?}{}",
            total,
            config.direction,
            if config.looping { ", looping" } else { "" }
        );
        schedule(&self.inner);
        Ok(())
    }

    /// Cancel pending steps and freeze at the current step
    pub fn pause(&self) {
        let cancelled = cancel_pending(&self.inner);
        self.inner.borrow_mut().playing = false;
        tracing::debug!("SequenceController: paused ({} timer(s) cancelled)", cancelled);
    }

    /// Cancel pending steps and return to the not-started state
    pub fn reset(&self) {
        let cancelled = cancel_pending(&self.inner);
        let mut inner = self.inner.borrow_mut();
        inner.current = None;
        inner.playing = false;
        inner.cycle = 0;
        tracing::debug!("SequenceController: reset ({} timer(s) cancelled)", cancelled);
    }

    /// Whether `step` has been revealed
    ///
    /// Forward sequences reveal steps up to the current one, reverse sequences
    /// reveal steps from the current one upward. Nothing is revealed before
    /// the first transition.
    pub fn should_animate_step(&self, step: usize) -> bool {
        let inner = self.inner.borrow();
        match (inner.direction, inner.current) {
            (_, None) => false,
            (Direction::Forward, Some(current)) => step <= current,
            (Direction::Reverse, Some(current)) => step >= current,
        }
    }

    /// Current step, `None` before the first transition
    pub fn current_step(&self) -> Option<usize> {
        self.inner.borrow().current
    }

    pub fn is_playing(&self) -> bool {
        self.inner.borrow().playing
    }

    pub fn direction(&self) -> Direction {
        self.inner.borrow().direction
    }

    /// Completed loop cycles of the current `play()`
    pub fn cycle(&self) -> u32 {
        self.inner.borrow().cycle
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Delay table computed by the last `play()`
    pub fn delays(&self) -> DelayTable {
        self.inner.borrow().delays.clone()
    }

    /// Plan computed by the last `play()`
    pub fn plan(&self) -> Vec<ScheduledStep> {
        self.inner.borrow().plan.clone()
    }

    /// Register an observer called after every step transition
    ///
    /// A panicking observer is logged and skipped; it never stops later
    /// steps from firing.
    pub fn on_step<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&StepEvent) + 'static,
    {
        self.inner.borrow_mut().observers.insert(Rc::new(observer))
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.borrow_mut().observers.remove(id).is_some()
    }
}

impl fmt::Debug for SequenceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SequenceController")
            .field("current", &inner.current)
            .field("playing", &inner.playing)
            .field("direction", &inner.direction)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl Drop for SequenceController {
    fn drop(&mut self) {
        let cancelled = cancel_pending(&self.inner);
        if cancelled > 0 {
            tracing::trace!("SequenceController: dropped with {} pending timer(s)", cancelled);
        }
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Clear every pending timer; returns how many were cleared
fn cancel_pending(inner: &Rc<RefCell<SequenceInner>>) -> usize {
    let (host, pending) = {
        let mut guard = inner.borrow_mut();
        (Rc::clone(&guard.host), std::mem::take(&mut guard.pending))
    };

    for (_, handle) in &pending {
        host.clear_timeout(*handle);
    }
    pending.len()
}

/// Schedule one timer per plan entry, offsets measured from now
fn schedule(inner: &Rc<RefCell<SequenceInner>>) {
    let (host, plan) = {
        let guard = inner.borrow();
        (Rc::clone(&guard.host), guard.plan.clone())
    };

    let mut pending = SmallVec::with_capacity(plan.len());
    for (position, scheduled) in plan.iter().copied().enumerate() {
        let weak = Rc::downgrade(inner);
        let handle = host.set_timeout(
            scheduled.fire_at,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    fire_step(&inner, position, scheduled.step);
                }
            }),
        );
        pending.push((TimerSlot::Step(position), handle));
    }

    let mut guard = inner.borrow_mut();
    guard.pending = pending;
    guard.playing = true;
}

fn fire_step(inner: &Rc<RefCell<SequenceInner>>, position: usize, step: usize) {
    let (event, observers) = {
        let mut guard = inner.borrow_mut();
        guard
            .pending
            .retain(|(slot, _)| *slot != TimerSlot::Step(position));
        guard.current = Some(step);

        let is_final = position + 1 == guard.plan.len();
        if is_final && !guard.looping {
            guard.playing = false;
        }

        let event = StepEvent {
            step,
            position,
            cycle: guard.cycle,
            is_final,
        };
        (event, guard.observers())
    };

    tracing::trace!(
        "SequenceController: step {} (position {}, cycle {})",
        event.step,
        event.position,
        event.cycle
    );
    notify_observers(&observers, &event);

    if event.is_final {
        schedule_loop_restart(inner);
    }
}

/// After the final step of a looping sequence, wait and start over
fn schedule_loop_restart(inner: &Rc<RefCell<SequenceInner>>) {
    let host = {
        let guard = inner.borrow();
        // An observer may have paused, reset, or replayed in the meantime
        if !(guard.looping && guard.playing && guard.pending.is_empty()) {
            return;
        }
        Rc::clone(&guard.host)
    };

    let weak = Rc::downgrade(inner);
    let handle = host.set_timeout(
        LOOP_PAUSE,
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                restart_cycle(&inner);
            }
        }),
    );
    inner
        .borrow_mut()
        .pending
        .push((TimerSlot::LoopRestart, handle));
}

fn restart_cycle(inner: &Rc<RefCell<SequenceInner>>) {
    let preference = {
        let mut guard = inner.borrow_mut();
        guard.pending.retain(|(slot, _)| *slot != TimerSlot::LoopRestart);
        guard.preference.clone()
    };

    // Re-poll: the user may have asked for reduced motion mid-loop
    if preference.prefers_reduced_motion() {
        tracing::debug!("SequenceController: reduced motion enabled, ending loop");
        jump_to_final(inner);
        return;
    }

    {
        let mut guard = inner.borrow_mut();
        guard.current = None;
        guard.cycle += 1;
    }
    schedule(inner);
}

fn jump_to_final(inner: &Rc<RefCell<SequenceInner>>) {
    let (event, observers) = {
        let mut guard = inner.borrow_mut();
        let total = guard.plan.len();
        if total == 0 {
            return;
        }
        let step = guard.direction.final_step(total);
        guard.current = Some(step);
        guard.playing = false;
        (
            StepEvent {
                step,
                position: total - 1,
                cycle: guard.cycle,
                is_final: true,
            },
            guard.observers(),
        )
    };

    notify_observers(&observers, &event);
}

fn notify_observers(observers: &[StepObserver], event: &StepEvent) {
    for observer in observers {
        let result = panic::catch_unwind(AssertUnwindSafe(|| observer(event)));
        if result.is_err() {
            tracing::error!("SequenceController: step observer panicked on step {}", event.step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_core::MotionError;
    use motif_platform::{HeadlessHost, VirtualHost};
    use std::cell::Cell;

    fn setup() -> (Rc<VirtualHost>, SequenceController) {
        let host = Rc::new(VirtualHost::new());
        let sequence = SequenceController::new(host.clone(), MotionPreference::new(host.clone()));
        (host, sequence)
    }

    fn record(sequence: &SequenceController) -> Rc<RefCell<Vec<StepEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        sequence.on_step(move |event| sink.borrow_mut().push(*event));
        log
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_initial_state() {
        let (_host, sequence) = setup();
        assert_eq!(sequence.current_step(), None);
        assert!(!sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 0);
        assert!(!sequence.should_animate_step(0));
    }

    #[test]
    fn test_plays_five_steps_in_order() {
        let (host, sequence) = setup();
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();
        assert!(sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 5);

        let plan = sequence.plan();
        for pair in plan.windows(2) {
            assert!(pair[1].fire_at >= pair[0].fire_at);
        }

        host.advance(Duration::from_secs(2));

        let steps: Vec<usize> = log.borrow().iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
        assert_eq!(sequence.current_step(), Some(4));
        assert!(!sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 0);
        assert!(log.borrow()[4].is_final);
    }

    #[test]
    fn test_steps_fire_at_cumulative_offsets() {
        let (host, sequence) = setup();

        sequence.play(&SequenceConfig::new(3).base_delay(0.1).initial_delay(0.05)).unwrap();

        host.advance(ms(49));
        assert_eq!(sequence.current_step(), None);
        host.advance(ms(1));
        assert_eq!(sequence.current_step(), Some(0));
        host.advance(ms(100));
        assert_eq!(sequence.current_step(), Some(1));
        host.advance(ms(100));
        assert_eq!(sequence.current_step(), Some(2));
    }

    #[test]
    fn test_reverse_direction() {
        let (host, sequence) = setup();
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(4).base_delay(0.1).reverse()).unwrap();
        host.advance(ms(150));

        assert_eq!(sequence.current_step(), Some(2));
        assert!(sequence.should_animate_step(3));
        assert!(sequence.should_animate_step(2));
        assert!(!sequence.should_animate_step(1));

        host.advance(Duration::from_secs(1));
        let steps: Vec<usize> = log.borrow().iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_should_animate_step_forward() {
        let (host, sequence) = setup();
        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();
        host.advance(ms(150));

        assert_eq!(sequence.current_step(), Some(1));
        assert!(sequence.should_animate_step(0));
        assert!(sequence.should_animate_step(1));
        assert!(!sequence.should_animate_step(2));
    }

    #[test]
    fn test_pause_freezes_current_step() {
        let (host, sequence) = setup();
        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();

        host.advance(ms(250));
        assert_eq!(sequence.current_step(), Some(2));

        sequence.pause();
        assert!(!sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 0);
        assert_eq!(host.pending_timers(), 0);

        host.advance(Duration::from_secs(10));
        assert_eq!(sequence.current_step(), Some(2));

        // Playing again starts over
        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();
        assert_eq!(sequence.current_step(), None);
        host.advance(Duration::from_secs(1));
        assert_eq!(sequence.current_step(), Some(4));
    }

    #[test]
    fn test_reset_cancels_everything() {
        let (host, sequence) = setup();
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();
        host.advance(ms(120));
        assert_eq!(log.borrow().len(), 2);

        sequence.reset();
        assert_eq!(sequence.current_step(), None);
        assert!(!sequence.is_playing());
        assert_eq!(host.pending_timers(), 0);

        host.advance(Duration::from_secs(5));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(sequence.current_step(), None);
    }

    #[test]
    fn test_replay_never_overlaps_schedules() {
        let (host, sequence) = setup();
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        host.advance(ms(50));
        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        assert_eq!(host.pending_timers(), 3);

        host.advance(Duration::from_secs(1));
        let steps: Vec<usize> = log.borrow().iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_reduced_motion_jumps_to_final() {
        let (host, sequence) = setup();
        let log = record(&sequence);
        host.set_media_feature("prefers-reduced-motion", "reduce");

        sequence.play(&SequenceConfig::new(5).base_delay(0.1)).unwrap();

        assert_eq!(sequence.current_step(), Some(4));
        assert!(!sequence.is_playing());
        assert_eq!(host.pending_timers(), 0);
        assert_eq!(log.borrow().len(), 1);
        assert!((0..5).all(|step| sequence.should_animate_step(step)));

        sequence.play(&SequenceConfig::new(5).base_delay(0.1).reverse()).unwrap();
        assert_eq!(sequence.current_step(), Some(0));
        assert!((0..5).all(|step| sequence.should_animate_step(step)));
    }

    #[test]
    fn test_headless_host_jumps_to_final() {
        let host: Rc<dyn TimerHost> = Rc::new(HeadlessHost::new());
        let sequence = SequenceController::new(host, MotionPreference::headless());

        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        assert_eq!(sequence.current_step(), Some(2));
        assert!(!sequence.is_playing());
    }

    #[test]
    fn test_invalid_config_leaves_schedule_untouched() {
        let (host, sequence) = setup();
        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        host.advance(ms(10));

        assert!(sequence.play(&SequenceConfig::new(3).base_delay(-1.0)).is_err());
        assert!(sequence.play(&SequenceConfig::new(3).initial_delay(-1.0)).is_err());

        assert!(sequence.is_playing());
        assert_eq!(sequence.current_step(), Some(0));
        assert_eq!(sequence.pending_timers(), 2);
    }

    #[test]
    fn test_zero_steps() {
        let (host, sequence) = setup();
        sequence.play(&SequenceConfig::new(0)).unwrap();
        assert!(!sequence.is_playing());
        assert_eq!(sequence.current_step(), None);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_looping_restarts_after_pause() {
        let (host, sequence) = setup();
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(2).base_delay(0.1).looping(true)).unwrap();

        // Steps at 0ms and 100ms, then the loop restart is due at 1100ms
        host.advance(ms(150));
        assert_eq!(log.borrow().len(), 2);
        assert!(sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 1);

        host.advance(ms(900));
        assert_eq!(log.borrow().len(), 2);
        host.advance(ms(100));
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(sequence.cycle(), 1);
        assert_eq!(log.borrow()[2].cycle, 1);

        sequence.reset();
        assert_eq!(host.pending_timers(), 0);
        host.advance(Duration::from_secs(10));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_loop_ends_when_reduced_motion_enabled() {
        let (host, sequence) = setup();

        sequence.play(&SequenceConfig::new(3).base_delay(0.1).looping(true)).unwrap();
        host.advance(ms(500));
        host.set_media_feature("prefers-reduced-motion", "reduce");
        host.advance(Duration::from_secs(2));

        assert_eq!(sequence.current_step(), Some(2));
        assert!(!sequence.is_playing());
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn test_drop_cancels_pending_timers() {
        let (host, sequence) = setup();
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        sequence.on_step(move |_| f.set(f.get() + 1));

        sequence.play(&SequenceConfig::new(5).base_delay(0.1).looping(true)).unwrap();
        host.advance(ms(50));
        drop(sequence);

        assert_eq!(host.pending_timers(), 0);
        host.advance(Duration::from_secs(5));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_schedule() {
        let (host, sequence) = setup();
        sequence.on_step(|event| {
            if event.step == 1 {
                panic!("observer failure");
            }
        });
        let log = record(&sequence);

        sequence.play(&SequenceConfig::new(4).base_delay(0.1)).unwrap();
        host.advance(Duration::from_secs(1));

        assert_eq!(log.borrow().len(), 4);
        assert_eq!(sequence.current_step(), Some(3));

        sequence.reset();
        assert_eq!(sequence.current_step(), None);
    }

    #[test]
    fn test_observer_can_be_removed() {
        let (host, sequence) = setup();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = sequence.on_step(move |_| c.set(c.get() + 1));

        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        host.advance(ms(50));
        assert!(sequence.remove_observer(id));
        host.advance(Duration::from_secs(1));

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_fibonacci_plan_offsets() {
        let config = SequenceConfig::new(5).base_delay(0.1).fibonacci();
        let delays = compute_delays(&config.stagger(false)).unwrap();
        let plan = plan_steps(&config, &delays).unwrap();

        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].fire_at, Duration::ZERO);
        let gaps: Vec<Duration> = plan.windows(2).map(|p| p[1].fire_at - p[0].fire_at).collect();
        for pair in gaps.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_plan_falls_back_to_base_delay() {
        let config = SequenceConfig::new(3).base_delay(0.25);
        let plan = plan_steps(&config, &DelayTable::default()).unwrap();

        assert_eq!(plan[1].fire_at, Duration::from_millis(250));
        assert_eq!(plan[2].fire_at, Duration::from_millis(500));
    }

    #[test]
    fn test_oversized_delay_is_rejected_before_cancelling() {
        let (host, sequence) = setup();
        sequence.play(&SequenceConfig::new(3).base_delay(0.1)).unwrap();
        host.advance(ms(10));

        for base_delay in [1e20, f64::MAX] {
            let err = sequence.play(&SequenceConfig::new(3).base_delay(base_delay));
            assert!(matches!(err, Err(MotionError::InvalidConfig(_))));
        }

        assert!(sequence.is_playing());
        assert_eq!(sequence.pending_timers(), 2);
        host.advance(Duration::from_secs(1));
        assert_eq!(sequence.current_step(), Some(2));
    }

    #[test]
    fn test_delays_reflect_last_play() {
        let (host, sequence) = setup();
        assert!(sequence.delays().is_empty());

        sequence.play(&SequenceConfig::new(4).base_delay(0.2)).unwrap();
        assert_eq!(sequence.delays().as_slice(), &[0.2, 0.2, 0.2, 0.2]);

        host.set_media_feature("prefers-reduced-motion", "reduce");
        sequence.play(&SequenceConfig::new(4).base_delay(0.2)).unwrap();
        assert!(sequence.delays().iter().all(|&d| d == crate::stagger::MIN_DELAY));
    }
}
