//! # ObserverSet: identity-keyed set of attached observers
//!
//! ## What it guarantees
//! - Membership by identity: the same handle is stored at most once.
//! - Iteration in attachment order.
//! - Only the set's own reference is released on detach; the caller's handles stay valid.

use std::fmt;
use std::sync::Arc;

use crate::listeners::ObserverRef;

/// Attached observers, in attachment order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<ObserverRef>,
}

impl ObserverSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer`; returns `false` if the same handle was already present.
    pub fn insert(&mut self, observer: ObserverRef) -> bool {
        if self.contains(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes `observer`; returns `false` if it was not present.
    pub fn remove(&mut self, observer: &ObserverRef) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
        self.observers.len() != before
    }

    /// True if the same handle is attached.
    pub fn contains(&self, observer: &ObserverRef) -> bool {
        self.observers.iter().any(|o| Arc::ptr_eq(o, observer))
    }

    /// Copy of the current membership, used to drive one notification round.
    pub fn snapshot(&self) -> Vec<ObserverRef> {
        self.observers.clone()
    }

    /// Iterates over attached observers in attachment order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObserverRef> {
        self.observers.iter()
    }

    /// True if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

impl<'a> IntoIterator for &'a ObserverSet {
    type Item = &'a ObserverRef;
    type IntoIter = std::slice::Iter<'a, ObserverRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::handler::ErrorHandler;
    use crate::listeners::Observer;

    struct Named(&'static str);

    impl Observer for Named {
        fn update(&self, _subject: &ErrorHandler) -> Result<(), ListenerError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn named(name: &'static str) -> ObserverRef {
        Arc::new(Named(name))
    }

    #[test]
    fn test_identity_not_value() {
        let mut set = ObserverSet::new();
        let a = named("same");
        let b = named("same");
        assert!(set.insert(Arc::clone(&a)));
        assert!(!set.insert(Arc::clone(&a)));
        assert!(set.insert(b));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = ObserverSet::new();
        set.insert(named("a"));
        assert!(!set.remove(&named("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_attachment_order() {
        let mut set = ObserverSet::new();
        for name in ["one", "two", "three"] {
            set.insert(named(name));
        }
        let names: Vec<_> = set.iter().map(|o| o.name()).collect();
        assert_eq!(names, ["one", "two", "three"]);
    }

    #[test]
    fn test_detach_keeps_caller_handle_alive() {
        let mut set = ObserverSet::new();
        let a = named("a");
        set.insert(Arc::clone(&a));
        assert_eq!(Arc::strong_count(&a), 2);
        set.remove(&a);
        assert_eq!(Arc::strong_count(&a), 1);
        assert_eq!(a.name(), "a");
    }
}
