//! Hierarchical statecharts.
//!
//! States form a tree owned by a [`Statechart`]. A state refers to its parent
//! by [`StateId`] only, so there are no reference cycles between parents and
//! children.
//!
//! ## Key Components
//!
//! - [`State`]: A node (simple, composite, or final) with optional entry and
//!   exit hooks
//! - [`Statechart`]: Arena of states plus trigger-guarded [`Transition`]s
//! - [`StateError`]: Construction and navigation failures
//!
//! ## Example Usage
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use sim_statecharts::states::Statechart;
//!
//! let mut chart = Statechart::new("agent");
//! let alive = chart.add_composite("alive", None).unwrap();
//! let healthy = chart.add_simple("healthy", Some(alive)).unwrap();
//!
//! let order = Rc::new(RefCell::new(Vec::new()));
//! for id in [alive, healthy] {
//!     let order = order.clone();
//!     chart.on_enter(id, move |s| order.borrow_mut().push(s)).unwrap();
//! }
//!
//! chart.enter_state(healthy).unwrap();
//! assert_eq!(*order.borrow(), vec![alive, healthy]);
//! ```

mod chart;
mod error;
mod state;

pub use chart::{Statechart, Transition, TransitionId};
pub use error::StateError;
pub use state::{State, StateAction, StateId, StateKind};
