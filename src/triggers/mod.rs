//! Simulation-time triggers.
//!
//! A trigger guards a transition. It answers two questions on any tick:
//! is the guard currently satisfied (`is_valid`), and has the trigger fired in
//! the current initialization epoch (`is_triggered`).
//!
//! ## Key Components
//!
//! - [`Trigger`]: Handle with the shared lifecycle (`initialize`, `is_valid`,
//!   `is_triggered`)
//! - [`TriggerKind`]: The five kinds (timed, condition, probability,
//!   exponential decay, message)
//! - [`Condition`]: Named, fallible guard for condition triggers
//! - [`TriggerError`]: Rejected configuration
//!
//! ## Two-Phase Protocol
//!
//! Polling kinds can be valid before they are triggered. A condition trigger
//! whose guard already holds is valid as soon as it is queried, but it only
//! fires at its first scheduled poll. Timed and decay triggers have no such
//! intermediate phase: both flags flip together.
//!
//! ## Example Usage
//!
//! ```
//! use sim_statecharts::core::{RunEnvironment, SimConfig};
//! use sim_statecharts::schedule::Scheduler;
//! use sim_statecharts::triggers::{Condition, Trigger};
//!
//! let (schedule, env) = RunEnvironment::init(SimConfig::new(42));
//! let trigger = Trigger::condition(&env, Condition::from_fn("ready", || true)).unwrap();
//! trigger.initialize();
//!
//! // Guard holds, but the first poll is at t=1.
//! assert!(trigger.is_valid());
//! assert!(!trigger.is_triggered());
//!
//! schedule.execute();
//! assert_eq!(schedule.now(), 1.0);
//! assert!(trigger.is_triggered());
//! ```
//!
//! ## Error Handling
//!
//! A condition that fails to evaluate never propagates its error. The trigger
//! is treated as invalid and a diagnostic is published on the run's
//! [`crate::messages::MessageBus`].

mod error;
mod kind;
mod trigger;

pub use error::TriggerError;
pub use kind::{Condition, TriggerKind};
pub use trigger::{Trigger, TriggerStatus};
