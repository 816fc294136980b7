//! Message checkers.
//!
//! A checker is a pure predicate over a queued message. It looks at the
//! message's runtime type and/or value and never mutates anything.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// A value that can be compared against a type-erased message.
pub trait MessageValue: Debug {
    /// True if `message` has the same type and an equal value.
    fn matches(&self, message: &dyn Any) -> bool;
}

impl<T> MessageValue for T
where
    T: Any + PartialEq + Debug,
{
    fn matches(&self, message: &dyn Any) -> bool {
        message.downcast_ref::<T>().is_some_and(|m| m == self)
    }
}

/// Predicate deciding whether a queued message satisfies a message trigger.
#[derive(Debug)]
pub enum MessageChecker {
    /// Any message of the given runtime type.
    UnconditionalByType {
        type_id: TypeId,
        type_name: &'static str,
    },

    /// Messages equal to the given value (and of the same type).
    Equals(Box<dyn MessageValue>),
}

impl MessageChecker {
    /// Match any message of type `T`.
    ///
    /// ```
    /// use sim_statecharts::messages::MessageChecker;
    ///
    /// let checker = MessageChecker::by_type::<String>();
    /// assert!(checker.matches(&String::from("Hello")));
    /// assert!(!checker.matches(&42_i32));
    /// ```
    pub fn by_type<T: Any>() -> Self {
        Self::UnconditionalByType {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Match messages equal to `value`.
    ///
    /// ```
    /// use sim_statecharts::messages::MessageChecker;
    ///
    /// let checker = MessageChecker::equals(String::from("hello"));
    /// assert!(checker.matches(&String::from("hello")));
    /// assert!(!checker.matches(&String::from("Hello")));
    /// ```
    pub fn equals<T: Any + PartialEq + Debug>(value: T) -> Self {
        Self::Equals(Box::new(value))
    }

    /// Check a message.
    #[must_use]
    pub fn matches(&self, message: &dyn Any) -> bool {
        match self {
            Self::UnconditionalByType { type_id, .. } => <dyn Any as Any>::type_id(message) == *type_id,
            Self::Equals(value) => value.matches(message),
        }
    }

    /// Check an optional queue head. An empty queue never matches.
    #[must_use]
    pub fn matches_head(&self, head: Option<&dyn Any>) -> bool {
        head.is_some_and(|m| self.matches(m))
    }
}

impl std::fmt::Display for MessageChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnconditionalByType { type_name, .. } => write!(f, "any {type_name}"),
            Self::Equals(value) => write!(f, "equals {value:?}"),
        }
    }
}
