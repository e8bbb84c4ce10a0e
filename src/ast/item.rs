use crate::ast::{Function, Prototype};

/// One top-level construct, the unit the parser hands to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `def` with a body, including `def unary…` and `def binary…`
    Definition(Function),

    /// `extern` signature without a body
    Extern(Prototype),

    /// Bare expression, wrapped as an anonymous zero-argument function
    Expression(Function),
}
