use std::collections::HashMap;

use crate::ir::SlotId;

/// Variable bindings visible while lowering a function body.
///
/// A name is visible iff some frame, scanned innermost-first, binds it.
/// Function bodies, `for` loops and `var` expressions each push a frame and
/// pop it on the way out, which restores whatever the shadowed names meant
/// before, including "unbound".
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, SlotId>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Binds `name` in the innermost frame.
    pub fn bind(&mut self, name: &str, slot: SlotId) {
        if self.frames.is_empty() {
            self.push_frame();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), slot);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<SlotId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drops frames until only `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
