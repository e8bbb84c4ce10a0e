//! Binary operator precedence table.
//!
//! The parser consults the table to decide whether the lookahead character is
//! an infix operator and how tightly it binds. The lowering pass is the only
//! writer: it installs a symbol when a `binary` definition is lowered and
//! rolls the change back if that definition fails.

use std::collections::HashMap;

/// Built-in operators and their precedence; higher binds tighter.
pub const BUILTIN_OPERATORS: [(char, u32); 5] =
    [('=', 2), ('<', 10), ('+', 20), ('-', 20), ('*', 40)];

/// Mapping from operator symbol to precedence.
///
/// A symbol that is absent (or installed with precedence 0) is not an infix
/// operator.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    precedence: HashMap<char, u32>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorTable {
    /// A table seeded with the built-in operators.
    pub fn new() -> Self {
        OperatorTable {
            precedence: BUILTIN_OPERATORS.into_iter().collect(),
        }
    }

    /// A table without even the built-ins.
    pub fn empty() -> Self {
        OperatorTable {
            precedence: HashMap::new(),
        }
    }

    /// Precedence of `symbol`, or `None` if it is not usable in infix position.
    pub fn lookup(&self, symbol: char) -> Option<u32> {
        self.precedence.get(&symbol).copied().filter(|p| *p > 0)
    }

    /// Installs or overwrites `symbol`, returning the precedence it replaced.
    pub fn install(&mut self, symbol: char, precedence: u32) -> Option<u32> {
        self.precedence.insert(symbol, precedence)
    }

    /// Removes `symbol`, returning its precedence if it was installed.
    pub fn uninstall(&mut self, symbol: char) -> Option<u32> {
        self.precedence.remove(&symbol)
    }

    /// Puts `symbol` back the way it was before an [`install`](Self::install).
    pub fn restore(&mut self, symbol: char, previous: Option<u32>) {
        match previous {
            Some(p) => {
                self.precedence.insert(symbol, p);
            }
            None => {
                self.precedence.remove(&symbol);
            }
        }
    }
}
