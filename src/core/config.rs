//! Run configuration types.
//!
//! A simulation run is configured by:
//! - `SimConfig`: Seed, start time, and trigger defaults
//! - `TriggerConfig`: Data-only description of a trigger, as emitted by a
//!   statechart generator
//!
//! Triggers guarded by code (conditions, message checkers) cannot be described
//! as data and are constructed directly.

use serde::{Deserialize, Serialize};

/// Polling interval used when a trigger does not configure its own.
pub const DEFAULT_POLLING_INTERVAL: f64 = 1.0;

/// Configuration for one simulation run.
///
/// ```
/// use sim_statecharts::core::SimConfig;
///
/// let config = SimConfig::new(42).with_polling_interval(0.5);
/// assert_eq!(config.seed, 42);
/// assert_eq!(config.default_polling_interval, 0.5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for the run's random source.
    pub seed: u64,

    /// Simulation time the schedule starts at.
    #[serde(default)]
    pub start_time: f64,

    /// Interval between polls for condition, probability and message triggers
    /// that do not set their own.
    #[serde(default = "default_polling_interval")]
    pub default_polling_interval: f64,
}

fn default_polling_interval() -> f64 {
    DEFAULT_POLLING_INTERVAL
}

impl SimConfig {
    /// Create a configuration with the given seed and default settings.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_time: 0.0,
            default_polling_interval: DEFAULT_POLLING_INTERVAL,
        }
    }

    /// Set the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the default polling interval.
    #[must_use]
    pub fn with_polling_interval(mut self, interval: f64) -> Self {
        self.default_polling_interval = interval;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Data-only trigger description.
///
/// `polling_interval` of `None` falls back to
/// [`SimConfig::default_polling_interval`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Fires a fixed delay after initialization.
    Timed { delay: f64 },

    /// Bernoulli trial decided at the first poll.
    Probability {
        probability: f64,
        #[serde(default)]
        polling_interval: Option<f64>,
    },

    /// Fires after an exponentially distributed waiting time.
    ExponentialDecay { rate: f64 },
}
