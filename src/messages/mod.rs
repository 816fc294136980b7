//! Messaging: the diagnostics bus, producer-owned message queues, and the
//! checkers message triggers use to inspect a queue head.
//!
//! ## Key Components
//!
//! - [`MessageBus`]: Synchronous publish/subscribe channel for runtime
//!   diagnostics. One per simulation run.
//! - [`MessageQueue`]: FIFO owned by a producer. Triggers only ever peek it
//!   through a weak [`QueueRef`].
//! - [`MessageChecker`]: Pure predicate over a message's type or value.

mod bus;
mod checker;
mod queue;

pub use bus::{ListenerId, MessageBus, MessageEvent, MessageLevel, MessageListener};
pub use checker::{MessageChecker, MessageValue};
pub use queue::{Message, MessageQueue, QueueRef};
