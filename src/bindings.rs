//! Action-to-key lookup
//!
//! The host's input system owns the real bindings; widgets only ask which key
//! an action is currently mapped to.

use std::collections::HashMap;

use crate::types::{Action, KeyCode};

pub trait ActionBindings {
    /// Key currently bound to `action`, if any
    fn resolve(&self, action: Action) -> Option<KeyCode>;
}

/// Fixed binding table
#[derive(Debug, Clone, Default)]
pub struct StaticBindings {
    keys: HashMap<Action, KeyCode>,
}

impl StaticBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, action: Action, key: KeyCode) -> &mut Self {
        if action.is_bound() && key.is_bound() {
            self.keys.insert(action, key);
        } else {
            self.keys.remove(&action);
        }
        self
    }
}

impl FromIterator<(Action, KeyCode)> for StaticBindings {
    fn from_iter<I: IntoIterator<Item = (Action, KeyCode)>>(iter: I) -> Self {
        let mut bindings = Self::new();
        for (action, key) in iter {
            bindings.bind(action, key);
        }
        bindings
    }
}

impl ActionBindings for StaticBindings {
    fn resolve(&self, action: Action) -> Option<KeyCode> {
        self.keys.get(&action).copied()
    }
}

/// Key a widget should fire: its explicit key wins over the action's binding
pub fn effective_key(action: Action, key: KeyCode, bindings: &dyn ActionBindings) -> Option<KeyCode> {
    if key.is_bound() {
        return Some(key);
    }
    if action.is_bound() {
        return bindings.resolve(action);
    }
    None
}
