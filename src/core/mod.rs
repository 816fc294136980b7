//! Core run types: configuration, the seeded random source, and the
//! per-run environment that ties the collaborators together.

pub mod config;
pub mod environment;
pub mod rng;

pub use config::{SimConfig, TriggerConfig, DEFAULT_POLLING_INTERVAL};
pub use environment::RunEnvironment;
pub use rng::SimRng;
