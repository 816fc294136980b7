//! Trigger configuration errors.

use thiserror::Error;

/// Rejected trigger parameters.
///
/// Triggers validate at construction so a misconfigured trigger never runs.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TriggerError {
    #[error("Delay must be finite and non-negative, got {0}")]
    InvalidDelay(f64),

    #[error("Probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Decay rate must be finite and positive, got {0}")]
    InvalidRate(f64),

    #[error("Polling interval must be finite and positive, got {0}")]
    InvalidPollingInterval(f64),
}

impl TriggerError {
    pub(crate) fn check_delay(delay: f64) -> Result<f64, Self> {
        if delay.is_finite() && delay >= 0.0 {
            Ok(delay)
        } else {
            Err(Self::InvalidDelay(delay))
        }
    }

    pub(crate) fn check_probability(probability: f64) -> Result<f64, Self> {
        if (0.0..=1.0).contains(&probability) {
            Ok(probability)
        } else {
            Err(Self::InvalidProbability(probability))
        }
    }

    pub(crate) fn check_rate(rate: f64) -> Result<f64, Self> {
        if rate.is_finite() && rate > 0.0 {
            Ok(rate)
        } else {
            Err(Self::InvalidRate(rate))
        }
    }

    pub(crate) fn check_polling_interval(interval: f64) -> Result<f64, Self> {
        if interval.is_finite() && interval > 0.0 {
            Ok(interval)
        } else {
            Err(Self::InvalidPollingInterval(interval))
        }
    }
}
