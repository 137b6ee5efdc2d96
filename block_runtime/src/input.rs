//! Input state fed in by the host between ticks.

use std::collections::HashSet;

/// Keys currently held down, by key name (e.g. `"ArrowLeft"`, `" "`).
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    held: HashSet<String>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: impl Into<String>) {
        self.held.insert(key.into());
    }

    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}
