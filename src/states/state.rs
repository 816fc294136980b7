//! Statechart nodes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifier of a state within its [`super::Statechart`].
///
/// States refer to their parent by id, never by pointer. The statechart owns
/// every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    /// Create a new state ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State({})", self.0)
    }
}

/// Entry or exit hook. Receives the id of the state being entered or exited.
pub type StateAction = Box<dyn FnMut(StateId)>;

/// The node variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateKind {
    /// Leaf state.
    Simple,

    /// State containing child states. Entering it directly descends into
    /// `initial`.
    Composite {
        children: SmallVec<[StateId; 4]>,
        initial: Option<StateId>,
    },

    /// Terminal leaf. A statechart resting here is finished.
    Final,
}

impl StateKind {
    /// Empty composite.
    pub fn composite() -> Self {
        Self::Composite {
            children: SmallVec::new(),
            initial: None,
        }
    }
}

/// A node of the statechart.
pub struct State {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) parent: Option<StateId>,
    pub(crate) kind: StateKind,
    pub(crate) active: bool,
    pub(crate) on_enter: Option<StateAction>,
    pub(crate) on_exit: Option<StateAction>,
}

impl State {
    pub(crate) fn new(id: StateId, name: String, parent: Option<StateId>, kind: StateKind) -> Self {
        Self {
            id,
            name,
            parent,
            kind,
            active: false,
            on_enter: None,
            on_exit: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> StateId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    #[must_use]
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Whether the state is part of the current configuration.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, StateKind::Composite { .. })
    }

    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self.kind, StateKind::Final)
    }

    /// Child states (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[StateId] {
        match &self.kind {
            StateKind::Composite { children, .. } => children.as_slice(),
            StateKind::Simple | StateKind::Final => &[],
        }
    }

    /// Initial child of a composite.
    #[must_use]
    pub fn initial(&self) -> Option<StateId> {
        match &self.kind {
            StateKind::Composite { initial, .. } => *initial,
            StateKind::Simple | StateKind::Final => None,
        }
    }

    pub(crate) fn run_on_enter(&mut self) {
        if let Some(action) = self.on_enter.as_mut() {
            action(self.id);
        }
    }

    pub(crate) fn run_on_exit(&mut self) {
        if let Some(action) = self.on_exit.as_mut() {
            action(self.id);
        }
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("kind", &self.kind)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_id() {
        let id = StateId::new(3);
        assert_eq!(id.raw(), 3);
        assert_eq!(id.to_string(), "State(3)");
    }

    #[test]
    fn test_leaf_has_no_children() {
        let state = State::new(StateId(0), "leaf".into(), Some(StateId(1)), StateKind::Simple);
        assert!(state.has_parent());
        assert_eq!(state.parent(), Some(StateId(1)));
        assert!(state.children().is_empty());
        assert_eq!(state.initial(), None);
        assert!(!state.is_active());
    }

    #[test]
    fn test_hooks_receive_id() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut state = State::new(StateId(7), "s".into(), None, StateKind::Final);
        state.on_enter = Some(Box::new(move |id| sink.borrow_mut().push(id)));

        state.run_on_enter();
        state.run_on_exit();
        assert_eq!(*seen.borrow(), vec![StateId(7)]);
        assert!(state.is_final());
    }
}
