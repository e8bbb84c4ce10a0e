use std::fmt;

/// Lexical tokens produced by the lexer.
///
/// The parser always holds exactly one of these as its lookahead.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Commands
    /// Function definition (`def`)
    ///
    /// # Examples
    /// ```text
    /// def add(a b) a + b
    /// ```
    Def,

    /// External declaration (`extern`)
    ///
    /// # Examples
    /// ```text
    /// extern sin(x)
    /// ```
    Extern,

    // Control flow
    /// `if`
    If,

    /// `then`
    Then,

    /// `else`
    Else,

    /// `for`
    For,

    /// `in`, closes the header of `for` and `var`
    In,

    /// Mutable local bindings (`var`)
    ///
    /// # Examples
    /// ```text
    /// var a = 1, b in a + b
    /// ```
    Var,

    // Operator declarations
    /// Prefix operator definition (`unary`)
    ///
    /// # Examples
    /// ```text
    /// def unary!(v) if v then 0 else 1
    /// ```
    Unary,

    /// Infix operator definition (`binary`), with optional precedence
    ///
    /// # Examples
    /// ```text
    /// def binary| 5 (a b) if a then 1 else if b then 1 else 0
    /// ```
    Binary,

    // Primaries
    /// Identifier: a letter followed by letters or digits
    Identifier(String),

    /// Numeric literal; every number is a 64-bit float
    Number(f64),

    /// Any other single ASCII character: operators, parentheses, commas, `;`
    Char(char),

    /// End of input
    Eof,
}

impl Token {
    /// Returns the operator symbol if this token can name an operator.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Token::Char(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::If => write!(f, "'if'"),
            Token::Then => write!(f, "'then'"),
            Token::Else => write!(f, "'else'"),
            Token::For => write!(f, "'for'"),
            Token::In => write!(f, "'in'"),
            Token::Var => write!(f, "'var'"),
            Token::Unary => write!(f, "'unary'"),
            Token::Binary => write!(f, "'binary'"),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
