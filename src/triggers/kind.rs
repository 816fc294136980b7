//! Trigger kinds and guard conditions.
//!
//! Every trigger is one of five kinds. The kind carries the configuration;
//! the lifecycle in [`super::Trigger`] is shared.

use crate::messages::{MessageChecker, QueueRef};

use super::error::TriggerError;

/// A named, fallible boolean guard.
///
/// The name shows up in diagnostics when evaluation fails.
///
/// ```
/// use sim_statecharts::triggers::Condition;
///
/// let mut always = Condition::from_fn("always", || true);
/// assert!(always.evaluate().unwrap());
///
/// let mut broken = Condition::new("broken", || anyhow::bail!("no data"));
/// assert!(broken.evaluate().is_err());
/// ```
pub struct Condition {
    name: String,
    predicate: Box<dyn FnMut() -> anyhow::Result<bool>>,
}

impl Condition {
    /// A condition whose evaluation may fail.
    pub fn new(
        name: impl Into<String>,
        predicate: impl FnMut() -> anyhow::Result<bool> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    /// A condition that cannot fail.
    pub fn from_fn(name: impl Into<String>, mut predicate: impl FnMut() -> bool + 'static) -> Self {
        Self::new(name, move || Ok(predicate()))
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the guard.
    pub fn evaluate(&mut self) -> anyhow::Result<bool> {
        (self.predicate)()
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Condition").field("name", &self.name).finish()
    }
}

/// The five trigger kinds.
#[derive(Debug)]
pub enum TriggerKind {
    /// Valid and triggered once `delay` has elapsed since initialization.
    Timed { delay: f64 },

    /// Polls `condition` every `polling_interval`. Valid while the condition
    /// holds; triggered once it holds at a scheduled poll.
    Condition {
        condition: Condition,
        polling_interval: f64,
    },

    /// Bernoulli trial drawn at initialization and revealed at the first poll.
    Probability {
        probability: f64,
        polling_interval: f64,
    },

    /// Fires after an exponentially distributed waiting time with hazard `rate`.
    ExponentialDecay { rate: f64 },

    /// Peeks the head of a producer-owned queue every `polling_interval`.
    Message {
        queue: QueueRef,
        checker: MessageChecker,
        polling_interval: f64,
    },
}

impl TriggerKind {
    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timed { .. } => "TimedTrigger",
            Self::Condition { .. } => "ConditionTrigger",
            Self::Probability { .. } => "ProbabilityTrigger",
            Self::ExponentialDecay { .. } => "ExponentialDecayRateTrigger",
            Self::Message { .. } => "MessageTrigger",
        }
    }

    /// Interval between polls, for the polling kinds.
    #[must_use]
    pub fn polling_interval(&self) -> Option<f64> {
        match self {
            Self::Condition { polling_interval, .. }
            | Self::Probability { polling_interval, .. }
            | Self::Message { polling_interval, .. } => Some(*polling_interval),
            Self::Timed { .. } | Self::ExponentialDecay { .. } => None,
        }
    }

    /// Whether `is_valid` re-evaluates the guard on every query.
    #[must_use]
    pub fn evaluates_lazily(&self) -> bool {
        matches!(self, Self::Condition { .. } | Self::Message { .. })
    }

    /// Reject parameters that would make the trigger meaningless.
    pub fn validate(&self) -> Result<(), TriggerError> {
        match self {
            Self::Timed { delay } => TriggerError::check_delay(*delay).map(drop),
            Self::Probability {
                probability,
                polling_interval,
            } => {
                TriggerError::check_probability(*probability)?;
                TriggerError::check_polling_interval(*polling_interval).map(drop)
            }
            Self::ExponentialDecay { rate } => TriggerError::check_rate(*rate).map(drop),
            Self::Condition { polling_interval, .. } | Self::Message { polling_interval, .. } => {
                TriggerError::check_polling_interval(*polling_interval).map(drop)
            }
        }
    }

    /// Evaluate the guard of a lazily evaluated kind.
    ///
    /// Returns whether it holds, plus a diagnostic if evaluation failed.
    /// Other kinds report `false`.
    pub(crate) fn evaluate_guard(&mut self) -> (bool, Option<String>) {
        match self {
            Self::Condition {
                condition,
                polling_interval,
            } => match condition.evaluate() {
                Ok(holds) => (holds, None),
                Err(err) => {
                    tracing::warn!(
                        condition = condition.name(),
                        error = %err,
                        "condition evaluation failed"
                    );
                    let diagnostic = format!(
                        "Error encountered when calling condition: {} in ConditionTrigger with pollingTime: {:?}",
                        condition.name(),
                        polling_interval
                    );
                    (false, Some(diagnostic))
                }
            },
            Self::Message { queue, checker, .. } => (queue.peek_with(|head| checker.matches_head(head)), None),
            Self::Timed { .. } | Self::Probability { .. } | Self::ExponentialDecay { .. } => (false, None),
        }
    }

    /// Display label: the kind plus what it guards on.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Timed { delay } => format!("TimedTrigger(delay: {delay:?})"),
            Self::Condition {
                condition,
                polling_interval,
            } => format!(
                "ConditionTrigger({}, pollingTime: {polling_interval:?})",
                condition.name()
            ),
            Self::Probability {
                probability,
                polling_interval,
            } => format!("ProbabilityTrigger(p: {probability:?}, pollingTime: {polling_interval:?})"),
            Self::ExponentialDecay { rate } => format!("ExponentialDecayRateTrigger(rate: {rate:?})"),
            Self::Message {
                checker,
                polling_interval,
                ..
            } => format!("MessageTrigger({checker}, pollingTime: {polling_interval:?})"),
        }
    }
}
