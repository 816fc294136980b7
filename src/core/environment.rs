//! Per-run environment injected into triggers.
//!
//! A `RunEnvironment` bundles the collaborators a trigger needs: the
//! scheduler, the diagnostics bus, the random source, and the run
//! configuration. Cloning is cheap and every clone shares the same
//! collaborators, so one environment is created per simulation run and handed
//! to everything built for that run.

use std::cell::RefCell;
use std::rc::Rc;

use crate::messages::MessageBus;
use crate::schedule::{Schedule, Scheduler};

use super::{SimConfig, SimRng};

/// Collaborators shared by everything in one simulation run.
#[derive(Clone)]
pub struct RunEnvironment {
    scheduler: Rc<dyn Scheduler>,
    bus: Rc<MessageBus>,
    rng: Rc<RefCell<SimRng>>,
    config: Rc<SimConfig>,
}

impl RunEnvironment {
    /// Build an environment around an existing scheduler.
    pub fn new(scheduler: Rc<dyn Scheduler>, config: SimConfig) -> Self {
        Self {
            scheduler,
            bus: Rc::new(MessageBus::new()),
            rng: Rc::new(RefCell::new(SimRng::new(config.seed))),
            config: Rc::new(config),
        }
    }

    /// Create a fresh [`Schedule`] and an environment bound to it.
    ///
    /// ```
    /// use sim_statecharts::core::{RunEnvironment, SimConfig};
    ///
    /// let (schedule, env) = RunEnvironment::init(SimConfig::new(1).with_start_time(2.0));
    /// assert_eq!(env.now(), 2.0);
    /// assert_eq!(schedule.tick_count(), 2.0);
    /// ```
    pub fn init(config: SimConfig) -> (Rc<Schedule>, Self) {
        let schedule = Rc::new(Schedule::starting_at(config.start_time));
        let env = Self::new(schedule.clone(), config);
        (schedule, env)
    }

    /// Replace the message bus (to share one bus between environments).
    #[must_use]
    pub fn with_bus(mut self, bus: Rc<MessageBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    #[must_use]
    pub fn bus(&self) -> &Rc<MessageBus> {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the run's random source.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut SimRng) -> R) -> R {
        f(&mut self.rng.borrow_mut())
    }
}

impl std::fmt::Debug for RunEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunEnvironment")
            .field("now", &self.now())
            .field("config", &self.config)
            .finish()
    }
}
