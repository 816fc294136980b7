//! The shared trigger lifecycle.
//!
//! ## Protocol
//!
//! 1. `initialize()` clears both flags, bumps the epoch, records the
//!    initialization time, and schedules one check: the first poll for polling
//!    kinds, or the single firing check for timed and decay triggers.
//! 2. A check that comes due is applied exactly once, by whichever gets there
//!    first: the scheduled callback or a direct `is_valid`/`is_triggered` query.
//! 3. A failed poll of a condition or message trigger schedules the next one.
//!    Every other check is final for the epoch.
//!
//! Scheduled callbacks hold only a weak handle and the epoch they were created
//! under. A callback from an older epoch, or for a dropped trigger, does
//! nothing.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::core::{RunEnvironment, TriggerConfig};
use crate::messages::{MessageChecker, MessageQueue};

use super::error::TriggerError;
use super::kind::{Condition, TriggerKind};

/// Snapshot of a trigger's lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TriggerStatus {
    /// `initialize()` has been called at least once.
    pub initialized: bool,
    /// Checks are scheduled and queries answer. Cleared by `disarm()`.
    pub armed: bool,
    /// The guard currently holds.
    pub valid: bool,
    /// The trigger has fired in this epoch.
    pub triggered: bool,
    /// Generation counter, bumped by every `initialize()`.
    pub epoch: u64,
    /// Simulation time of the latest `initialize()`.
    pub initialization_time: f64,
    /// When the pending check comes due. `None` once the epoch is settled.
    pub next_check: Option<f64>,
}

/// Mutable per-trigger state.
#[derive(Debug)]
struct TriggerCore {
    kind: TriggerKind,
    status: TriggerStatus,
    /// Bernoulli result drawn at initialization (probability triggers).
    drawn_outcome: bool,
}

/// Work left over after the core borrow is released.
#[derive(Debug, Default)]
struct Followup {
    diagnostic: Option<String>,
    reschedule: Option<(u64, f64)>,
}

impl TriggerCore {
    fn arm(&mut self, now: f64, env: &RunEnvironment) -> (u64, f64) {
        let offset = match &self.kind {
            TriggerKind::Timed { delay } => *delay,
            TriggerKind::ExponentialDecay { rate } => env.with_rng(|rng| rng.exponential(*rate)),
            TriggerKind::Probability {
                probability,
                polling_interval,
            } => {
                self.drawn_outcome = env.with_rng(|rng| rng.bernoulli(*probability));
                *polling_interval
            }
            TriggerKind::Condition { polling_interval, .. }
            | TriggerKind::Message { polling_interval, .. } => *polling_interval,
        };

        let status = &mut self.status;
        status.initialized = true;
        status.armed = true;
        status.valid = false;
        status.triggered = false;
        status.epoch += 1;
        status.initialization_time = now;
        status.next_check = Some(now + offset);
        (status.epoch, now + offset)
    }

    /// Stop the current epoch without starting a new one.
    fn disarm(&mut self) -> bool {
        let status = &mut self.status;
        if !status.armed {
            return false;
        }
        status.armed = false;
        status.valid = false;
        status.triggered = false;
        status.epoch += 1;
        status.next_check = None;
        true
    }

    fn is_due(&self, now: f64) -> bool {
        self.status.next_check.is_some_and(|at| now >= at)
    }

    /// Apply the pending check. Caller ensures it is due.
    fn apply_check(&mut self, now: f64) -> Followup {
        let mut followup = Followup::default();
        let scheduled_at = self.status.next_check.take().unwrap_or(now);

        if self.kind.evaluates_lazily() {
            let (holds, diagnostic) = self.kind.evaluate_guard();
            followup.diagnostic = diagnostic;
            self.status.valid = holds;
            if holds {
                self.status.triggered = true;
            } else if let Some(interval) = self.kind.polling_interval() {
                let next = next_poll_after(scheduled_at, interval, now);
                self.status.next_check = Some(next);
                followup.reschedule = Some((self.status.epoch, next));
            }
        } else {
            // Timed, decay and probability checks settle the epoch.
            self.status.valid = true;
            self.status.triggered = match self.kind {
                TriggerKind::Probability { .. } => self.drawn_outcome,
                _ => true,
            };
        }

        tracing::trace!(
            kind = self.kind.name(),
            epoch = self.status.epoch,
            time = now,
            valid = self.status.valid,
            triggered = self.status.triggered,
            "trigger check"
        );
        followup
    }

    fn query_valid(&mut self, now: f64) -> (bool, Followup) {
        if !self.status.armed || self.status.triggered {
            return (self.status.triggered, Followup::default());
        }
        if self.is_due(now) {
            let followup = self.apply_check(now);
            return (self.status.valid, followup);
        }
        if self.kind.evaluates_lazily() {
            let (holds, diagnostic) = self.kind.evaluate_guard();
            self.status.valid = holds;
            return (
                holds,
                Followup {
                    diagnostic,
                    reschedule: None,
                },
            );
        }
        (self.status.valid, Followup::default())
    }

    fn query_triggered(&mut self, now: f64) -> (bool, Followup) {
        if self.status.armed && !self.status.triggered && self.is_due(now) {
            let followup = self.apply_check(now);
            return (self.status.triggered, followup);
        }
        (self.status.triggered, Followup::default())
    }
}

/// First multiple of `interval` after `scheduled_at` that lies beyond `now`.
///
/// Missed polls are skipped rather than replayed.
fn next_poll_after(scheduled_at: f64, interval: f64, now: f64) -> f64 {
    let next = scheduled_at + interval;
    if next > now {
        return next;
    }
    let skipped = ((now - scheduled_at) / interval).floor() + 1.0;
    let candidate = scheduled_at + skipped * interval;
    if candidate > now {
        candidate
    } else {
        candidate + interval
    }
}

/// Collaborators plus the mutable core, shared with scheduled callbacks.
struct TriggerShared {
    env: RunEnvironment,
    core: RefCell<TriggerCore>,
}

impl TriggerShared {
    fn schedule_check(self: &Rc<Self>, epoch: u64, at: f64) {
        let handle: Weak<Self> = Rc::downgrade(self);
        self.env.scheduler().schedule_one_time(
            at,
            Box::new(move || {
                if let Some(shared) = handle.upgrade() {
                    shared.on_scheduled_check(epoch);
                }
            }),
        );
    }

    fn on_scheduled_check(self: &Rc<Self>, epoch: u64) {
        let now = self.env.now();
        let followup = {
            let mut core = self.core.borrow_mut();
            if core.status.epoch != epoch {
                tracing::trace!(
                    kind = core.kind.name(),
                    stale_epoch = epoch,
                    current_epoch = core.status.epoch,
                    "ignoring stale check"
                );
                return;
            }
            if !core.is_due(now) {
                // Already applied by a direct query.
                return;
            }
            core.apply_check(now)
        };
        self.finish(followup);
    }

    /// Publish diagnostics and schedule follow-up polls outside the core borrow.
    fn finish(self: &Rc<Self>, followup: Followup) {
        if let Some(message) = followup.diagnostic {
            self.env.bus().error(message);
        }
        if let Some((epoch, at)) = followup.reschedule {
            self.schedule_check(epoch, at);
        }
    }
}

/// A guard deciding when a transition may fire.
///
/// Clones are handles to the same trigger.
///
/// ```
/// use sim_statecharts::core::{RunEnvironment, SimConfig};
/// use sim_statecharts::schedule::Scheduler;
/// use sim_statecharts::triggers::Trigger;
///
/// let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
/// let trigger = Trigger::timed(&env, 2.0).unwrap();
/// trigger.initialize();
///
/// assert!(!trigger.is_triggered());
/// schedule.execute();
/// assert_eq!(schedule.now(), 2.0);
/// assert!(trigger.is_valid());
/// assert!(trigger.is_triggered());
/// ```
#[derive(Clone)]
pub struct Trigger {
    shared: Rc<TriggerShared>,
}

impl Trigger {
    /// Build a trigger of the given kind, rejecting invalid parameters.
    pub fn new(env: &RunEnvironment, kind: TriggerKind) -> Result<Self, TriggerError> {
        kind.validate()?;
        Ok(Self {
            shared: Rc::new(TriggerShared {
                env: env.clone(),
                core: RefCell::new(TriggerCore {
                    kind,
                    status: TriggerStatus::default(),
                    drawn_outcome: false,
                }),
            }),
        })
    }

    /// Fires `delay` after initialization.
    pub fn timed(env: &RunEnvironment, delay: f64) -> Result<Self, TriggerError> {
        Self::new(env, TriggerKind::Timed { delay })
    }

    /// Polls `condition` at the run's default polling interval.
    pub fn condition(env: &RunEnvironment, condition: Condition) -> Result<Self, TriggerError> {
        let polling_interval = env.config().default_polling_interval;
        Self::condition_every(env, condition, polling_interval)
    }

    /// Polls `condition` every `polling_interval`.
    pub fn condition_every(
        env: &RunEnvironment,
        condition: Condition,
        polling_interval: f64,
    ) -> Result<Self, TriggerError> {
        Self::new(
            env,
            TriggerKind::Condition {
                condition,
                polling_interval,
            },
        )
    }

    /// Bernoulli trial with success `probability`, revealed at the first poll.
    pub fn probability(env: &RunEnvironment, probability: f64) -> Result<Self, TriggerError> {
        Self::new(
            env,
            TriggerKind::Probability {
                probability,
                polling_interval: env.config().default_polling_interval,
            },
        )
    }

    /// Fires after an `Exp(rate)` waiting time.
    pub fn exponential_decay(env: &RunEnvironment, rate: f64) -> Result<Self, TriggerError> {
        Self::new(env, TriggerKind::ExponentialDecay { rate })
    }

    /// Watches the head of `queue` at the run's default polling interval.
    ///
    /// The trigger keeps only a weak, peek-only reference to the queue.
    pub fn message(
        env: &RunEnvironment,
        queue: &MessageQueue,
        checker: MessageChecker,
    ) -> Result<Self, TriggerError> {
        let polling_interval = env.config().default_polling_interval;
        Self::message_every(env, queue, checker, polling_interval)
    }

    /// Watches the head of `queue` every `polling_interval`.
    pub fn message_every(
        env: &RunEnvironment,
        queue: &MessageQueue,
        checker: MessageChecker,
        polling_interval: f64,
    ) -> Result<Self, TriggerError> {
        Self::new(
            env,
            TriggerKind::Message {
                queue: queue.downgrade(),
                checker,
                polling_interval,
            },
        )
    }

    /// Build a data-described trigger.
    pub fn from_config(env: &RunEnvironment, config: &TriggerConfig) -> Result<Self, TriggerError> {
        let kind = match *config {
            TriggerConfig::Timed { delay } => TriggerKind::Timed { delay },
            TriggerConfig::Probability {
                probability,
                polling_interval,
            } => TriggerKind::Probability {
                probability,
                polling_interval: polling_interval.unwrap_or(env.config().default_polling_interval),
            },
            TriggerConfig::ExponentialDecay { rate } => TriggerKind::ExponentialDecay { rate },
        };
        Self::new(env, kind)
    }

    /// Re-arm the trigger.
    ///
    /// Clears both flags and schedules the first check. Checks scheduled by
    /// earlier calls become no-ops.
    pub fn initialize(&self) {
        let now = self.shared.env.now();
        let (epoch, at) = {
            let mut core = self.shared.core.borrow_mut();
            let armed = core.arm(now, &self.shared.env);
            tracing::debug!(
                kind = core.kind.name(),
                epoch = armed.0,
                time = now,
                check_at = armed.1,
                "trigger initialized"
            );
            armed
        };
        self.shared.schedule_check(epoch, at);
    }

    /// Stop the trigger until the next `initialize()`.
    ///
    /// Both flags clear, no further checks run, and a pending scheduled check
    /// becomes a no-op. Disarming an unarmed trigger does nothing.
    pub fn disarm(&self) {
        let mut core = self.shared.core.borrow_mut();
        if core.disarm() {
            tracing::debug!(kind = core.kind.name(), epoch = core.status.epoch, "trigger disarmed");
        }
    }

    /// Whether the guard currently holds.
    ///
    /// Condition and message triggers re-evaluate their guard on every call.
    /// Evaluation errors are reported on the bus and count as `false`.
    pub fn is_valid(&self) -> bool {
        let now = self.shared.env.now();
        let (valid, followup) = self.shared.core.borrow_mut().query_valid(now);
        self.shared.finish(followup);
        valid
    }

    /// Whether the trigger has fired in the current epoch.
    pub fn is_triggered(&self) -> bool {
        let now = self.shared.env.now();
        let (triggered, followup) = self.shared.core.borrow_mut().query_triggered(now);
        self.shared.finish(followup);
        triggered
    }

    /// Diagnostic name of the trigger's kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.shared.core.borrow().kind.name()
    }

    #[must_use]
    pub fn polling_interval(&self) -> Option<f64> {
        self.shared.core.borrow().kind.polling_interval()
    }

    #[must_use]
    pub fn status(&self) -> TriggerStatus {
        self.shared.core.borrow().status
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.status().epoch
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.status().initialized
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.status().armed
    }

    #[must_use]
    pub fn initialization_time(&self) -> f64 {
        self.status().initialization_time
    }

    /// When the pending check comes due, if any.
    #[must_use]
    pub fn next_check_time(&self) -> Option<f64> {
        self.status().next_check
    }

    /// Whether two handles refer to the same trigger.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.shared.core.borrow().kind.describe())
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.shared.core.borrow();
        f.debug_struct("Trigger")
            .field("kind", &core.kind.name())
            .field("status", &core.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SimConfig;
    use crate::schedule::Scheduler;
    use std::cell::Cell;

    fn marker(env: &RunEnvironment, at: f64) {
        env.scheduler().schedule_one_time(at, Box::new(|| ()));
    }

    #[test]
    fn test_next_poll_after() {
        assert_eq!(next_poll_after(1.0, 1.0, 1.0), 2.0);
        assert_eq!(next_poll_after(1.0, 1.0, 3.5), 4.0);
        assert_eq!(next_poll_after(1.0, 0.5, 2.0), 2.5);
    }

    #[test]
    fn test_uninitialized_trigger_is_inert() {
        let (_, env) = RunEnvironment::init(SimConfig::new(1));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let trigger = Trigger::condition(
            &env,
            Condition::from_fn("count", move || {
                counter.set(counter.get() + 1);
                true
            }),
        )
        .unwrap();

        assert!(!trigger.is_valid());
        assert!(!trigger.is_triggered());
        assert_eq!(calls.get(), 0);
        assert_eq!(trigger.epoch(), 0);
    }

    #[test]
    fn test_initialize_records_time_and_epoch() {
        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        marker(&env, 3.0);
        schedule.execute();

        let trigger = Trigger::timed(&env, 2.0).unwrap();
        trigger.initialize();
        assert_eq!(trigger.initialization_time(), 3.0);
        assert_eq!(trigger.next_check_time(), Some(5.0));
        assert_eq!(trigger.epoch(), 1);

        trigger.initialize();
        assert_eq!(trigger.epoch(), 2);
    }

    #[test]
    fn test_direct_query_applies_due_poll_once() {
        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let trigger = Trigger::condition(
            &env,
            Condition::from_fn("count", move || {
                counter.set(counter.get() + 1);
                false
            }),
        )
        .unwrap();

        // Registered before the trigger's own poll, so it runs first at t=1.
        let early = trigger.clone();
        env.scheduler().schedule_one_time(
            1.0,
            Box::new(move || {
                assert!(!early.is_triggered());
            }),
        );
        trigger.initialize();

        schedule.execute();
        assert_eq!(schedule.now(), 1.0);
        assert_eq!(calls.get(), 1);
        assert_eq!(trigger.next_check_time(), Some(2.0));

        // Same tick: no second poll.
        assert!(!trigger.is_triggered());
        assert_eq!(calls.get(), 1);

        schedule.execute();
        assert_eq!(schedule.now(), 2.0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_latched_after_trigger() {
        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        let flag = Rc::new(Cell::new(true));
        let guard = flag.clone();
        let trigger = Trigger::condition(&env, Condition::from_fn("flag", move || guard.get())).unwrap();
        trigger.initialize();

        schedule.execute();
        assert!(trigger.is_triggered());

        flag.set(false);
        assert!(trigger.is_valid());
        assert!(trigger.is_triggered());
        assert_eq!(trigger.next_check_time(), None);
    }

    #[test]
    fn test_display() {
        let (_, env) = RunEnvironment::init(SimConfig::new(1));
        let trigger = Trigger::condition(&env, Condition::from_fn("Ready", || true)).unwrap();
        assert_eq!(trigger.to_string(), "ConditionTrigger(Ready, pollingTime: 1.0)");
        assert_eq!(trigger.kind_name(), "ConditionTrigger");
    }

    #[test]
    fn test_from_config_uses_default_interval() {
        let (_, env) = RunEnvironment::init(SimConfig::new(1).with_polling_interval(0.25));
        let trigger = Trigger::from_config(
            &env,
            &TriggerConfig::Probability {
                probability: 0.5,
                polling_interval: None,
            },
        )
        .unwrap();
        assert_eq!(trigger.polling_interval(), Some(0.25));

        let err = Trigger::from_config(&env, &TriggerConfig::ExponentialDecay { rate: -1.0 }).unwrap_err();
        assert_eq!(err, TriggerError::InvalidRate(-1.0));
    }

    #[test]
    fn test_disarm_stops_polling() {
        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let trigger = Trigger::condition(
            &env,
            Condition::from_fn("count", move || {
                counter.set(counter.get() + 1);
                false
            }),
        )
        .unwrap();
        trigger.initialize();
        schedule.execute();
        assert_eq!(calls.get(), 1);

        trigger.disarm();
        assert!(!trigger.is_armed());
        assert_eq!(trigger.epoch(), 2);
        assert_eq!(trigger.next_check_time(), None);

        schedule.execute_until(10.0);
        assert!(!trigger.is_valid());
        assert!(!trigger.is_triggered());
        assert_eq!(calls.get(), 1);
        assert_eq!(schedule.pending_count(), 0);

        trigger.initialize();
        assert!(trigger.is_armed());
        assert_eq!(trigger.epoch(), 3);
    }

    #[test]
    fn test_disarm_clears_fired_trigger() {
        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        let trigger = Trigger::timed(&env, 1.0).unwrap();
        trigger.disarm();
        assert_eq!(trigger.epoch(), 0);

        trigger.initialize();
        schedule.execute();
        assert!(trigger.is_triggered());

        trigger.disarm();
        assert!(!trigger.is_triggered());
        assert!(trigger.is_initialized());
    }
}
