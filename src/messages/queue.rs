//! Producer-owned FIFO message queue.
//!
//! The producer owns a [`MessageQueue`]; triggers hold a [`QueueRef`], a weak
//! handle that can only peek. Dropping the owner empties the queue from the
//! triggers' point of view.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// A queued message of any type.
pub type Message = Box<dyn Any>;

/// FIFO queue of heterogeneous messages, owned by its producer.
///
/// Clones share the same underlying queue.
#[derive(Clone, Default)]
pub struct MessageQueue {
    inner: Rc<RefCell<VecDeque<Message>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the tail.
    pub fn push<T: Any>(&self, message: T) {
        self.inner.borrow_mut().push_back(Box::new(message));
    }

    /// Remove and return the head.
    pub fn poll(&self) -> Option<Message> {
        self.inner.borrow_mut().pop_front()
    }

    /// Remove the head if it is a `T`, returning it typed.
    ///
    /// A head of another type is left in place.
    pub fn poll_as<T: Any>(&self) -> Option<T> {
        let mut queue = self.inner.borrow_mut();
        if !queue.front().is_some_and(|m| m.is::<T>()) {
            return None;
        }
        queue.pop_front()?.downcast::<T>().ok().map(|b| *b)
    }

    /// Inspect the head without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(Option<&dyn Any>) -> R) -> R {
        let queue = self.inner.borrow();
        f(queue.front().map(|m| &**m))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    /// A non-owning, read-only handle for triggers.
    #[must_use]
    pub fn downgrade(&self) -> QueueRef {
        QueueRef {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue").field("len", &self.len()).finish()
    }
}

/// Weak, peek-only view of a [`MessageQueue`].
#[derive(Clone, Debug)]
pub struct QueueRef {
    inner: Weak<RefCell<VecDeque<Message>>>,
}

impl QueueRef {
    /// Inspect the head. Sees `None` if the queue is empty or its owner is gone.
    pub fn peek_with<R>(&self, f: impl FnOnce(Option<&dyn Any>) -> R) -> R {
        match self.inner.upgrade() {
            Some(queue) => {
                let queue = queue.borrow();
                f(queue.front().map(|m| &**m))
            }
            None => f(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.push(1_i32);
        queue.push(2_i32);

        assert_eq!(queue.poll_as::<i32>(), Some(1));
        assert_eq!(queue.poll_as::<i32>(), Some(2));
        assert!(queue.poll().is_none());
    }

    #[test]
    fn test_poll_as_wrong_type_leaves_head() {
        let queue = MessageQueue::new();
        queue.push(String::from("hi"));

        assert_eq!(queue.poll_as::<i32>(), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.poll_as::<String>().as_deref(), Some("hi"));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = MessageQueue::new();
        queue.push(7_u8);

        let head = queue.peek_with(|m| m.and_then(|m| m.downcast_ref::<u8>()).copied());
        assert_eq!(head, Some(7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_ref_sees_shared_queue_and_owner_drop() {
        let queue = MessageQueue::new();
        let view = queue.downgrade();

        assert!(view.peek_with(|m| m.is_none()));
        queue.push(3_i64);
        assert!(view.peek_with(|m| m.is_some()));

        drop(queue);
        assert!(view.peek_with(|m| m.is_none()));
    }
}
