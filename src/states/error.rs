//! Statechart construction and navigation errors.

use thiserror::Error;

use super::StateId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Unknown state: {0}")]
    UnknownState(StateId),

    #[error("{0} is not a composite state and cannot have children")]
    NotComposite(StateId),

    #[error("Composite {0} has no initial state")]
    NoInitialState(StateId),

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: StateId, child: StateId },

    #[error("Duplicate state name: {0}")]
    DuplicateName(String),

    #[error("Statechart has no states")]
    Empty,
}
