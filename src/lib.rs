//! # sim-statecharts
//!
//! Simulation-time triggers and hierarchical statecharts for agent-based
//! models.
//!
//! ## Design Principles
//!
//! 1. **Simulation Time Only**: Every delay, polling interval and waiting time
//!    is measured on the scheduler's clock. Nothing reads wall-clock time.
//!
//! 2. **Injected Collaborators**: The scheduler, diagnostics bus and random
//!    source are bundled in a `RunEnvironment` and handed to each trigger.
//!    There is no global lookup.
//!
//! 3. **Fail Safe Guards**: A guard that errors degrades to "never fires" and
//!    reports on the bus. It never halts the simulation.
//!
//! ## Architecture
//!
//! - **Two-Phase Triggers**: Each trigger is *valid* while its guard holds and
//!   *triggered* once it has fired in the current epoch. Re-initializing
//!   starts a new epoch and silences every callback from the old one.
//!
//! - **Arena Statecharts**: States live in a `Statechart` and refer to their
//!   parent by id. Entering a state initializes its ancestors first.
//!
//! ## Modules
//!
//! - `core`: Configuration, seeded RNG, per-run environment
//! - `schedule`: Scheduler interface and a reference discrete-event schedule
//! - `messages`: Diagnostics bus, message queues, message checkers
//! - `triggers`: The five trigger kinds and their shared lifecycle
//! - `states`: State tree, entry/exit protocol, guarded transitions

pub mod core;
pub mod messages;
pub mod schedule;
pub mod states;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{RunEnvironment, SimConfig, SimRng, TriggerConfig};

pub use crate::schedule::{Schedule, ScheduledAction, Scheduler};

pub use crate::messages::{
    ListenerId, MessageBus, MessageChecker, MessageEvent, MessageLevel, MessageListener,
    MessageQueue, QueueRef,
};

pub use crate::triggers::{Condition, Trigger, TriggerError, TriggerKind, TriggerStatus};

pub use crate::states::{State, StateError, StateId, StateKind, Statechart, Transition, TransitionId};
