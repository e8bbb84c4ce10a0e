use std::collections::HashMap;

use crate::ast::Prototype;

/// Every signature seen so far, by function name.
///
/// Outlives individual IR modules, so a call can still be resolved after the
/// module holding the callee's body was handed to the backend. A later `def`
/// or `extern` of the same name overwrites the entry without comparing
/// signatures.
#[derive(Debug, Default)]
pub struct PrototypeCache {
    prototypes: HashMap<String, Prototype>,
}

impl PrototypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `prototype`, returning the entry it replaced.
    pub fn insert(&mut self, prototype: Prototype) -> Option<Prototype> {
        self.prototypes.insert(prototype.name.clone(), prototype)
    }

    pub fn get(&self, name: &str) -> Option<&Prototype> {
        self.prototypes.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Prototype> {
        self.prototypes.remove(name)
    }

    /// Puts `name` back the way it was before an [`insert`](Self::insert).
    pub fn restore(&mut self, name: &str, previous: Option<Prototype>) {
        match previous {
            Some(p) => {
                self.prototypes.insert(name.to_string(), p);
            }
            None => {
                self.prototypes.remove(name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.prototypes.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}
