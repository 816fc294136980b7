//! The statechart arena: state tree, guarded transitions, entry/exit protocol.
//!
//! ## Entry Order
//!
//! `enter_state(s)` first asks the parent to enter "from a child", which
//! recurses upward, and only then initializes `s`. Ancestors are therefore
//! always initialized before their descendants. An ancestor that is already
//! active is not initialized again, so moving between siblings leaves the
//! shared parent alone.
//!
//! ## Transitions
//!
//! Initializing a state re-arms the triggers of every transition leaving it.
//! [`Statechart::step`] walks from the active leaf toward the root and takes
//! the first transition whose trigger has fired.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::triggers::Trigger;

use super::error::StateError;
use super::state::{State, StateAction, StateId, StateKind};

/// Identifier of a transition within its statechart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionId(pub u32);

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transition({})", self.0)
    }
}

/// A guarded edge between two states.
#[derive(Debug)]
pub struct Transition {
    pub id: TransitionId,
    pub from: StateId,
    pub to: StateId,
    pub trigger: Trigger,
}

/// Path from a state up to the root, the state itself first.
type Lineage = SmallVec<[StateId; 8]>;

/// Owns a tree of states and the transitions between them.
///
/// ```
/// use sim_statecharts::core::{RunEnvironment, SimConfig};
/// use sim_statecharts::states::Statechart;
/// use sim_statecharts::triggers::Trigger;
///
/// let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
/// let mut chart = Statechart::new("door");
/// let closed = chart.add_simple("closed", None).unwrap();
/// let open = chart.add_simple("open", None).unwrap();
/// chart.add_transition(closed, open, Trigger::timed(&env, 3.0).unwrap()).unwrap();
///
/// chart.start().unwrap();
/// assert_eq!(chart.current_state(), Some(closed));
///
/// schedule.execute();
/// assert!(chart.step().unwrap().is_some());
/// assert_eq!(chart.current_state(), Some(open));
/// ```
#[derive(Debug)]
pub struct Statechart {
    name: String,
    states: Vec<State>,
    by_name: FxHashMap<String, StateId>,
    transitions: Vec<Transition>,
    entry: Option<StateId>,
    current: Option<StateId>,
}

impl Statechart {
    /// Create an empty statechart.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            by_name: FxHashMap::default(),
            transitions: Vec::new(),
            entry: None,
            current: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Construction ===

    /// Add a leaf state.
    pub fn add_simple(&mut self, name: impl Into<String>, parent: Option<StateId>) -> Result<StateId, StateError> {
        self.add_state(name.into(), parent, StateKind::Simple)
    }

    /// Add a composite state.
    pub fn add_composite(&mut self, name: impl Into<String>, parent: Option<StateId>) -> Result<StateId, StateError> {
        self.add_state(name.into(), parent, StateKind::composite())
    }

    /// Add a final state.
    pub fn add_final(&mut self, name: impl Into<String>, parent: Option<StateId>) -> Result<StateId, StateError> {
        self.add_state(name.into(), parent, StateKind::Final)
    }

    /// Add a state of any kind.
    ///
    /// The first child of a composite becomes its initial state, and the first
    /// top-level state becomes the entry state, unless changed later.
    pub fn add_state(&mut self, name: String, parent: Option<StateId>, kind: StateKind) -> Result<StateId, StateError> {
        if self.by_name.contains_key(&name) {
            return Err(StateError::DuplicateName(name));
        }
        let id = StateId(self.states.len() as u32);

        match parent {
            Some(parent_id) => match &mut self.get_mut(parent_id)?.kind {
                StateKind::Composite { children, initial } => {
                    children.push(id);
                    initial.get_or_insert(id);
                }
                StateKind::Simple | StateKind::Final => return Err(StateError::NotComposite(parent_id)),
            },
            None => {
                self.entry.get_or_insert(id);
            }
        }

        self.by_name.insert(name.clone(), id);
        self.states.push(State::new(id, name, parent, kind));
        Ok(id)
    }

    /// Choose which child a composite descends into when entered directly.
    pub fn set_initial(&mut self, parent: StateId, child: StateId) -> Result<(), StateError> {
        self.get(child)?;
        match &mut self.get_mut(parent)?.kind {
            StateKind::Composite { children, initial } => {
                if !children.contains(&child) {
                    return Err(StateError::NotAChild { parent, child });
                }
                *initial = Some(child);
                Ok(())
            }
            StateKind::Simple | StateKind::Final => Err(StateError::NotComposite(parent)),
        }
    }

    /// Choose the state [`Statechart::start`] enters.
    pub fn set_entry_state(&mut self, id: StateId) -> Result<(), StateError> {
        self.get(id)?;
        self.entry = Some(id);
        Ok(())
    }

    /// Hook run each time the state is initialized.
    pub fn on_enter(&mut self, id: StateId, action: impl FnMut(StateId) + 'static) -> Result<(), StateError> {
        let action: StateAction = Box::new(action);
        self.get_mut(id)?.on_enter = Some(action);
        Ok(())
    }

    /// Hook run each time the state is exited.
    pub fn on_exit(&mut self, id: StateId, action: impl FnMut(StateId) + 'static) -> Result<(), StateError> {
        let action: StateAction = Box::new(action);
        self.get_mut(id)?.on_exit = Some(action);
        Ok(())
    }

    /// Add a transition guarded by `trigger`.
    ///
    /// If `from` is already active the trigger is armed immediately.
    pub fn add_transition(&mut self, from: StateId, to: StateId, trigger: Trigger) -> Result<TransitionId, StateError> {
        let active = self.get(from)?.active;
        self.get(to)?;
        if active {
            trigger.initialize();
        }
        let id = TransitionId(self.transitions.len() as u32);
        self.transitions.push(Transition { id, from, to, trigger });
        Ok(id)
    }

    // === Queries ===

    /// Look up a state.
    pub fn get(&self, id: StateId) -> Result<&State, StateError> {
        self.states.get(id.index()).ok_or(StateError::UnknownState(id))
    }

    fn get_mut(&mut self, id: StateId) -> Result<&mut State, StateError> {
        self.states.get_mut(id.index()).ok_or(StateError::UnknownState(id))
    }

    /// Look up a state by name.
    #[must_use]
    pub fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    /// Whether the state has a parent. Unknown states have none.
    #[must_use]
    pub fn has_parent(&self, id: StateId) -> bool {
        self.parent(id).is_some()
    }

    /// The (non-owning) parent of a state.
    #[must_use]
    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.get(id).ok().and_then(State::parent)
    }

    #[must_use]
    pub fn is_active(&self, id: StateId) -> bool {
        self.get(id).is_ok_and(State::is_active)
    }

    /// The active leaf state.
    #[must_use]
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    /// Active states from the root down to the current leaf.
    #[must_use]
    pub fn active_states(&self) -> Vec<StateId> {
        let mut path: Vec<_> = self.current.map(|leaf| self.lineage(leaf).into_vec()).unwrap_or_default();
        path.reverse();
        path
    }

    /// Whether the current leaf is a final state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current.is_some_and(|id| self.get(id).is_ok_and(State::is_final))
    }

    #[must_use]
    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.0 as usize)
    }

    /// Transitions leaving `id`, in declaration order.
    pub fn transitions_from(&self, id: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.from == id)
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    // === Entry / exit protocol ===

    /// Enter the entry state.
    pub fn start(&mut self) -> Result<(), StateError> {
        let entry = self.entry.ok_or(StateError::Empty)?;
        self.enter_state(entry)
    }

    /// Enter a state: ancestors first, then the state itself. A composite
    /// then descends into its initial child.
    pub fn enter_state(&mut self, id: StateId) -> Result<(), StateError> {
        if let Some(parent) = self.get(id)?.parent {
            self.enter_state_from_child(parent)?;
        }
        self.initialize_state(id)?;

        let descend = match &self.get(id)?.kind {
            StateKind::Composite { initial, .. } => Some(initial.ok_or(StateError::NoInitialState(id))?),
            StateKind::Simple | StateKind::Final => None,
        };

        match descend {
            Some(child) => self.enter_state(child),
            None => {
                self.current = Some(id);
                Ok(())
            }
        }
    }

    /// Make sure `id` and its ancestors are active, because a descendant is
    /// being entered. Already active states are left as they are.
    pub fn enter_state_from_child(&mut self, id: StateId) -> Result<(), StateError> {
        if let Some(parent) = self.get(id)?.parent {
            self.enter_state_from_child(parent)?;
        }
        if !self.get(id)?.active {
            self.initialize_state(id)?;
        }
        Ok(())
    }

    /// Activate a single state: run its entry hook and re-arm the triggers of
    /// its outgoing transitions. Does not touch parents or children.
    pub fn initialize_state(&mut self, id: StateId) -> Result<(), StateError> {
        let state = self.get_mut(id)?;
        state.active = true;
        state.run_on_enter();
        tracing::debug!(state = %id, name = %state.name, "state initialized");

        for transition in self.transitions.iter().filter(|t| t.from == id) {
            transition.trigger.initialize();
        }
        Ok(())
    }

    /// Exit a state. A composite exits its active children first.
    /// Triggers of transitions leaving the state are disarmed.
    /// Exiting an inactive state does nothing.
    pub fn exit_state(&mut self, id: StateId) -> Result<(), StateError> {
        let children: SmallVec<[StateId; 4]> = self.get(id)?.children().iter().copied().collect();
        for child in children {
            if self.get(child)?.active {
                self.exit_state(child)?;
            }
        }

        let parent = {
            let state = self.get_mut(id)?;
            if !state.active {
                return Ok(());
            }
            state.run_on_exit();
            state.active = false;
            tracing::debug!(state = %id, name = %state.name, "state exited");
            state.parent
        };

        for transition in self.transitions.iter().filter(|t| t.from == id) {
            transition.trigger.disarm();
        }

        if self.current == Some(id) {
            self.current = parent;
        }
        Ok(())
    }

    // === Stepping ===

    /// Take the first enabled transition, if any.
    ///
    /// Candidates are the transitions leaving the active leaf, then those
    /// leaving each ancestor in turn, each group in declaration order.
    pub fn step(&mut self) -> Result<Option<TransitionId>, StateError> {
        let Some(leaf) = self.current else {
            return Ok(None);
        };

        let fired = self.lineage(leaf).into_iter().find_map(|state| {
            self.transitions
                .iter()
                .filter(|t| t.from == state)
                .find(|t| t.trigger.is_triggered())
                .map(|t| (t.id, t.from, t.to))
        });

        let Some((id, from, to)) = fired else {
            return Ok(None);
        };
        tracing::debug!(transition = %id, %from, %to, "transition fired");
        self.fire(leaf, from, to)?;
        Ok(Some(id))
    }

    /// Exit everything below the transition's domain, then enter the target.
    ///
    /// The domain is the nearest state that is a proper ancestor of both
    /// `from` and `to`. A transition into one of the source's own ancestors
    /// therefore exits and re-enters that ancestor.
    fn fire(&mut self, leaf: StateId, from: StateId, to: StateId) -> Result<(), StateError> {
        let target_ancestors = self.lineage(to);
        let domain = self
            .lineage(from)
            .into_iter()
            .skip(1)
            .find(|ancestor| target_ancestors[1..].contains(ancestor));

        // Topmost active state strictly below the domain.
        let exit_root = self
            .lineage(leaf)
            .into_iter()
            .take_while(|s| Some(*s) != domain)
            .last()
            .unwrap_or(leaf);

        self.exit_state(exit_root)?;
        self.enter_state(to)
    }

    /// `id` followed by each of its ancestors.
    fn lineage(&self, id: StateId) -> Lineage {
        let mut path = Lineage::new();
        let mut cursor = Some(id);
        while let Some(state) = cursor {
            path.push(state);
            cursor = self.parent(state);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn record(chart: &mut Statechart, id: StateId, log: &Log) {
        let name = chart.get(id).unwrap().name().to_string();
        let enter_log = log.clone();
        let enter_name = name.clone();
        chart
            .on_enter(id, move |_| enter_log.borrow_mut().push(format!("enter {enter_name}")))
            .unwrap();
        let exit_log = log.clone();
        chart
            .on_exit(id, move |_| exit_log.borrow_mut().push(format!("exit {name}")))
            .unwrap();
    }

    #[test]
    fn test_first_children_become_initial_and_entry() {
        let mut chart = Statechart::new("t");
        let top = chart.add_composite("top", None).unwrap();
        let a = chart.add_simple("a", Some(top)).unwrap();
        chart.add_simple("b", Some(top)).unwrap();

        assert_eq!(chart.get(top).unwrap().initial(), Some(a));
        assert_eq!(chart.state_by_name("b"), Some(StateId(2)));
        chart.start().unwrap();
        assert_eq!(chart.active_states(), vec![top, a]);
    }

    #[test]
    fn test_leaf_cannot_have_children() {
        let mut chart = Statechart::new("t");
        let leaf = chart.add_simple("leaf", None).unwrap();
        assert_eq!(chart.add_simple("child", Some(leaf)), Err(StateError::NotComposite(leaf)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut chart = Statechart::new("t");
        chart.add_simple("x", None).unwrap();
        assert_eq!(chart.add_final("x", None), Err(StateError::DuplicateName("x".into())));
    }

    #[test]
    fn test_set_initial_requires_child() {
        let mut chart = Statechart::new("t");
        let top = chart.add_composite("top", None).unwrap();
        let stray = chart.add_simple("stray", None).unwrap();
        assert_eq!(
            chart.set_initial(top, stray),
            Err(StateError::NotAChild { parent: top, child: stray })
        );
    }

    #[test]
    fn test_composite_without_children_cannot_be_entered() {
        let mut chart = Statechart::new("t");
        let empty = chart.add_composite("empty", None).unwrap();
        assert_eq!(chart.start(), Err(StateError::NoInitialState(empty)));
    }

    #[test]
    fn test_enter_state_runs_parent_first() {
        let mut chart = Statechart::new("t");
        let outer = chart.add_composite("outer", None).unwrap();
        let inner = chart.add_composite("inner", Some(outer)).unwrap();
        let leaf = chart.add_simple("leaf", Some(inner)).unwrap();
        let log = Log::default();
        for id in [outer, inner, leaf] {
            record(&mut chart, id, &log);
        }

        chart.enter_state(leaf).unwrap();
        assert_eq!(*log.borrow(), vec!["enter outer", "enter inner", "enter leaf"]);
        assert_eq!(chart.current_state(), Some(leaf));
    }

    #[test]
    fn test_exit_composite_exits_children_first() {
        let mut chart = Statechart::new("t");
        let outer = chart.add_composite("outer", None).unwrap();
        let leaf = chart.add_simple("leaf", Some(outer)).unwrap();
        let log = Log::default();
        record(&mut chart, outer, &log);
        record(&mut chart, leaf, &log);

        chart.start().unwrap();
        log.borrow_mut().clear();
        chart.exit_state(outer).unwrap();

        assert_eq!(*log.borrow(), vec!["exit leaf", "exit outer"]);
        assert!(!chart.is_active(outer));
        assert_eq!(chart.current_state(), None);
        assert!(chart.active_states().is_empty());
    }

    #[test]
    fn test_exit_inactive_is_noop() {
        let mut chart = Statechart::new("t");
        let a = chart.add_simple("a", None).unwrap();
        let log = Log::default();
        record(&mut chart, a, &log);

        chart.exit_state(a).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unknown_state() {
        let mut chart = Statechart::new("t");
        assert!(!chart.has_parent(StateId(9)));
        assert_eq!(chart.parent(StateId(9)), None);
        assert_eq!(chart.enter_state(StateId(9)), Err(StateError::UnknownState(StateId(9))));
        assert_eq!(chart.start(), Err(StateError::Empty));
    }

    #[test]
    fn test_transition_to_own_parent_reenters_parent() {
        use crate::core::{RunEnvironment, SimConfig};

        let (schedule, env) = RunEnvironment::init(SimConfig::new(1));
        let mut chart = Statechart::new("t");
        let outer = chart.add_composite("outer", None).unwrap();
        let a = chart.add_simple("a", Some(outer)).unwrap();
        chart.add_simple("b", Some(outer)).unwrap();
        chart.add_transition(a, outer, Trigger::timed(&env, 1.0).unwrap()).unwrap();
        let log = Log::default();
        record(&mut chart, outer, &log);
        record(&mut chart, a, &log);

        chart.start().unwrap();
        schedule.execute();
        log.borrow_mut().clear();
        assert!(chart.step().unwrap().is_some());

        assert_eq!(*log.borrow(), vec!["exit a", "exit outer", "enter outer", "enter a"]);
        assert_eq!(chart.active_states(), vec![outer, a]);
    }
}
