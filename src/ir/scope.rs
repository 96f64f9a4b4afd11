//! Stack-discipline name scopes.
//!
//! Pushes and pops must nest with the tree structure of the pass using
//! the scope; a fact pushed on entry to a let must be popped on every
//! exit path. Popping a name that was never pushed is an internal error.

use rustc_hash::FxHashMap;

use crate::internal_error;

/// A lexically scoped map from variable name to facts of type `T`.
/// Shadowed bindings are kept in per-name stacks.
#[derive(Debug)]
pub struct Scope<T> {
    entries: FxHashMap<String, Vec<T>>,
}

impl<T> Scope<T> {
    pub fn new() -> Scope<T> {
        Scope {
            entries: FxHashMap::default(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.entries.entry(name.into()).or_default().push(value);
    }

    pub fn pop(&mut self, name: &str) {
        match self.entries.get_mut(name) {
            Some(stack) if !stack.is_empty() => {
                stack.pop();
                if stack.is_empty() {
                    self.entries.remove(name);
                }
            }
            _ => internal_error!("popping unbound scope entry '{}'", name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The innermost fact for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|stack| stack.last())
    }
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Scope::new()
    }
}
