//! Simulation clock and one-time action scheduling.
//!
//! Triggers only need two things from a scheduler: the current simulation time
//! and the ability to run a callback once that time reaches a given value.
//! The [`Scheduler`] trait captures exactly that, so embedders can plug in
//! their own discrete-event engine.
//!
//! [`Schedule`] is the reference implementation: single-threaded, no
//! cancellation, actions at equal times run in registration order.
//!
//! ## Example Usage
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use sim_statecharts::schedule::{Schedule, Scheduler};
//!
//! let schedule = Schedule::new();
//! let fired = Rc::new(Cell::new(false));
//! let flag = fired.clone();
//! schedule.schedule_one_time(2.0, Box::new(move || flag.set(true)));
//!
//! assert_eq!(schedule.execute(), Some(2.0));
//! assert!(fired.get());
//! assert_eq!(schedule.now(), 2.0);
//! ```

mod clock;

pub use clock::Schedule;

/// A callback run once by the scheduler.
pub type ScheduledAction = Box<dyn FnOnce()>;

/// The scheduler collaborator used by triggers.
///
/// Implementations must be single-threaded and must not hold internal borrows
/// while running an action: actions are free to call [`Scheduler::now`] and
/// [`Scheduler::schedule_one_time`] re-entrantly.
pub trait Scheduler {
    /// Current simulation time.
    fn now(&self) -> f64;

    /// Run `action` once simulation time reaches `at`.
    ///
    /// Times earlier than `now()` run at the next opportunity.
    fn schedule_one_time(&self, at: f64, action: ScheduledAction);
}
