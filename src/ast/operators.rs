/// Precedence given to a `binary` declaration that omits one.
pub const DEFAULT_BINARY_PRECEDENCE: u32 = 30;

/// Lowest and highest precedence a `binary` declaration may request.
pub const MIN_PRECEDENCE: u32 = 1;
pub const MAX_PRECEDENCE: u32 = 100;

/// Operator metadata carried by a prototype declared with `unary` or `binary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// Prefix operator; the function takes exactly one parameter
    Unary(char),

    /// Infix operator; the function takes exactly two parameters
    Binary { symbol: char, precedence: u32 },
}

impl OperatorKind {
    /// Number of parameters an operator function of this kind must declare.
    pub fn arity(&self) -> usize {
        match self {
            OperatorKind::Unary(_) => 1,
            OperatorKind::Binary { .. } => 2,
        }
    }

    /// Function name the operator is installed under (`unary-`, `binary|`).
    pub fn function_name(&self) -> String {
        match self {
            OperatorKind::Unary(c) => unary_function_name(*c),
            OperatorKind::Binary { symbol, .. } => binary_function_name(*symbol),
        }
    }
}

pub fn unary_function_name(op: char) -> String {
    format!("unary{}", op)
}

pub fn binary_function_name(op: char) -> String {
    format!("binary{}", op)
}
