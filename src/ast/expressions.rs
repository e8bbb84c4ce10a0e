/// Abstract Syntax Tree node representing a parsed expression.
///
/// The language has no statements: every construct, including loops and
/// local bindings, is an expression producing a 64-bit float. Each node owns
/// its children exclusively and is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 4.5
    /// ```
    Number(f64),

    /// Reference to a parameter or local binding
    Variable(String),

    /// Prefix operator application, lowered as a call to `unary<op>`
    ///
    /// # Example
    /// ```text
    /// !x
    /// -(a + b)
    /// ```
    Unary { op: char, operand: Box<Expr> },

    /// Infix operator application
    ///
    /// `=` is assignment: its left side must be a [`Expr::Variable`], which
    /// is checked during lowering, not parsing.
    Binary {
        op: char,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function call
    ///
    /// # Example
    /// ```text
    /// fib(n - 1)
    /// ```
    Call { callee: String, args: Vec<Expr> },

    /// Conditional; both arms are always present
    ///
    /// # Example
    /// ```text
    /// if n < 3 then 1 else fib(n - 1) + fib(n - 2)
    /// ```
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Counted loop; evaluates to `0.0`
    ///
    /// # Example
    /// ```text
    /// for i = 1, i < n, 1 in printd(i)
    /// ```
    For {
        var: String,
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
        body: Box<Expr>,
    },

    /// Mutable local bindings scoped over `body`
    ///
    /// # Example
    /// ```text
    /// var a = 1, b in a + b
    /// ```
    Var {
        bindings: Vec<(String, Option<Expr>)>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// Builds a binary node, boxing both operands.
    pub fn binary(op: char, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a unary node, boxing the operand.
    pub fn unary(op: char, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}
