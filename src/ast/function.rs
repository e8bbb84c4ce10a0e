use crate::ast::{Expr, OperatorKind};

/// Name given to the zero-argument function wrapping a bare top-level expression.
pub const ANONYMOUS_FUNCTION: &str = "__anon_expr";

/// A function signature without a body.
///
/// Every parameter and the return value are 64-bit floats, so the names are
/// all a signature needs to carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    /// Function name; `unary<op>` or `binary<op>` for operator functions
    pub name: String,

    /// Parameter names, in call order
    pub params: Vec<String>,

    /// Present when declared with `unary` or `binary`
    pub operator: Option<OperatorKind>,
}

impl Prototype {
    /// A plain, non-operator prototype.
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Prototype {
            name: name.into(),
            params,
            operator: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_unary_op(&self) -> bool {
        matches!(self.operator, Some(OperatorKind::Unary(_)))
    }

    /// Precedence of a binary operator prototype.
    pub fn binary_precedence(&self) -> Option<u32> {
        match self.operator {
            Some(OperatorKind::Binary { precedence, .. }) => Some(precedence),
            _ => None,
        }
    }
}

/// A prototype paired with its single body expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub prototype: Prototype,
    pub body: Expr,
}

impl Function {
    /// Wraps a bare top-level expression as a zero-argument function.
    pub fn anonymous(body: Expr) -> Self {
        Function {
            prototype: Prototype::new(ANONYMOUS_FUNCTION, Vec::new()),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.prototype.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.prototype.name == ANONYMOUS_FUNCTION
    }
}
