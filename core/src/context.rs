//! The ordered mapping threaded top-down through a preparation pass.
//!
//! A [`Context`] is cheap to clone: values are reference counted, so a clone is a
//! new map pointing at the same values. Each child receives the context produced by
//! its parent's render step; inserting into one clone never affects another, while
//! interior mutability inside a shared value is visible to everyone holding it.
//!
//! ```
//! use preparable_core::Context;
//!
//! let parent = Context::new().with("locale", String::from("en"));
//! let child = parent.clone().with("depth", 1_u32);
//!
//! assert_eq!(child.get::<String>("locale").map(String::as_str), Some("en"));
//! assert!(parent.get::<u32>("depth").is_none());
//! ```

use core::any::Any;
use core::fmt::{self, Debug};
use std::rc::Rc;

use indexmap::IndexMap;

/// Ordered, string-keyed, type-erased values.
#[derive(Clone, Default)]
pub struct Context {
    values: IndexMap<String, Rc<dyn Any>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value under `key`, replacing any previous one.
    pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Rc::new(value));
    }

    /// Inserts an already shared value, so that side effects made through it are
    /// visible to every holder of the `Rc`.
    pub fn insert_shared<T: 'static>(&mut self, key: impl Into<String>, value: Rc<T>) {
        self.values.insert(key.into(), value);
    }

    /// Borrows the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| value.downcast_ref())
    }

    /// Returns a shared handle on the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn get_shared<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        self.values
            .get(key)
            .and_then(|value| Rc::clone(value).downcast().ok())
    }

    /// Returns `true` if a value is stored under `key`, whatever its type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.shift_remove(key).is_some()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the context holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `self` with every entry of `other` applied on top.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &other.values {
            merged.values.insert(key.clone(), Rc::clone(value));
        }
        merged
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn typed_lookup_rejects_wrong_type() {
        let context = Context::new().with("n", 1_i32);
        assert_eq!(context.get::<i32>("n"), Some(&1));
        assert!(context.get::<u8>("n").is_none());
        assert!(context.contains("n"));
    }

    #[test]
    fn shared_values_carry_side_effects_across_clones() {
        let mut context = Context::new();
        context.insert_shared("log", Rc::new(RefCell::new(Vec::<&str>::new())));

        let sibling = context.clone();
        sibling
            .get::<RefCell<Vec<&str>>>("log")
            .unwrap()
            .borrow_mut()
            .push("seen");

        assert_eq!(
            *context.get::<RefCell<Vec<&str>>>("log").unwrap().borrow(),
            ["seen"]
        );
    }

    #[test]
    fn merge_keeps_order_and_overrides() {
        let base = Context::new().with("a", 1_u8).with("b", 2_u8);
        let merged = base.merged(&Context::new().with("b", 3_u8).with("c", 4_u8));
        assert_eq!(merged.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(merged.get::<u8>("b"), Some(&3));
        assert_eq!(base.get::<u8>("b"), Some(&2));
    }

    #[test]
    fn remove_preserves_order() {
        let mut context = Context::new().with("a", ()).with("b", ()).with("c", ());
        assert!(context.remove("b"));
        assert!(!context.remove("b"));
        assert_eq!(context.keys().collect::<Vec<_>>(), ["a", "c"]);
    }
}
