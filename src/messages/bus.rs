//! Synchronous publish/subscribe diagnostics channel.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Severity of a published message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A message delivered to bus listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Severity.
    pub level: MessageLevel,
    /// Human-readable text.
    pub message: String,
}

impl MessageEvent {
    pub fn new(level: MessageLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Receives every message published on a [`MessageBus`].
///
/// Closures taking `&MessageEvent` implement this directly.
pub trait MessageListener {
    fn message_received(&mut self, event: &MessageEvent);
}

impl<F> MessageListener for F
where
    F: FnMut(&MessageEvent),
{
    fn message_received(&mut self, event: &MessageEvent) {
        self(event)
    }
}

/// Handle returned by [`MessageBus::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Process-wide diagnostics channel for one simulation run.
///
/// Delivery is synchronous: every listener registered when `publish` is called
/// has seen the message before `publish` returns. A listener that publishes
/// from inside its callback has that message queued and delivered after the
/// current round, still before the outer `publish` returns.
///
/// Listeners may also be added or removed from inside a callback. The change
/// takes effect from the next message delivered.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use sim_statecharts::messages::{MessageBus, MessageEvent, MessageLevel};
///
/// let bus = MessageBus::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// bus.add_listener(move |e: &MessageEvent| sink.borrow_mut().push(e.message.clone()));
///
/// bus.publish(MessageLevel::Error, "boom");
/// assert_eq!(*seen.borrow(), vec!["boom".to_string()]);
/// ```
#[derive(Default)]
pub struct MessageBus {
    listeners: RefCell<Vec<(ListenerId, Box<dyn MessageListener>)>>,
    registered: RefCell<FxHashSet<ListenerId>>,
    staged: RefCell<Staged>,
    queued: RefCell<VecDeque<MessageEvent>>,
    next_id: Cell<u32>,
}

/// Listener changes requested while a delivery round holds the list.
#[derive(Default)]
struct Staged {
    added: Vec<(ListenerId, Box<dyn MessageListener>)>,
    removed: Vec<ListenerId>,
}

impl MessageBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It receives messages published from now on.
    pub fn add_listener(&self, listener: impl MessageListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.registered.borrow_mut().insert(id);

        let entry: (ListenerId, Box<dyn MessageListener>) = (id, Box::new(listener));
        match self.listeners.try_borrow_mut() {
            Ok(mut listeners) => listeners.push(entry),
            Err(_) => self.staged.borrow_mut().added.push(entry),
        }
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        if !self.registered.borrow_mut().remove(&id) {
            return false;
        }
        match self.listeners.try_borrow_mut() {
            Ok(mut listeners) => listeners.retain(|(lid, _)| *lid != id),
            Err(_) => self.staged.borrow_mut().removed.push(id),
        }
        true
    }

    /// Number of registered listeners, including ones staged mid-delivery.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registered.borrow().len()
    }

    /// Publish a message to every listener.
    pub fn publish(&self, level: MessageLevel, message: impl Into<String>) {
        let event = MessageEvent::new(level, message);
        match level {
            MessageLevel::Error => tracing::error!(message = %event.message),
            MessageLevel::Warn => tracing::warn!(message = %event.message),
            MessageLevel::Info => tracing::info!(message = %event.message),
            MessageLevel::Debug => tracing::debug!(message = %event.message),
        }

        self.queued.borrow_mut().push_back(event);

        // Re-entrant call: the outer publish is draining and will pick this up.
        let Ok(mut listeners) = self.listeners.try_borrow_mut() else {
            return;
        };

        loop {
            self.apply_staged(&mut listeners);
            let next = self.queued.borrow_mut().pop_front();
            let Some(event) = next else { break };
            for (_, listener) in listeners.iter_mut() {
                listener.message_received(&event);
            }
        }
    }

    /// Publish at [`MessageLevel::Error`].
    pub fn error(&self, message: impl Into<String>) {
        self.publish(MessageLevel::Error, message);
    }

    fn apply_staged(&self, listeners: &mut Vec<(ListenerId, Box<dyn MessageListener>)>) {
        let Staged { added, removed } = std::mem::take(&mut *self.staged.borrow_mut());
        listeners.extend(added);
        if !removed.is_empty() {
            listeners.retain(|(id, _)| !removed.contains(id));
        }
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
