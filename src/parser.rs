use std::fmt;

use crate::{
    ast::{
        Expr, Function, Item, OperatorKind, Prototype, Token,
        operators::{DEFAULT_BINARY_PRECEDENCE, MAX_PRECEDENCE, MIN_PRECEDENCE},
    },
    lexer::{LexError, Lexer, Position, TokenSource},
    operators::OperatorTable,
};

/// Errors that abort parsing of the current top-level construct.
///
/// None of them corrupt the parser: the caller skips a token with
/// [`Parser::skip_token`] and asks for the next item.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The token source could not produce a token
    Lex(LexError),

    /// A token other than the one the grammar requires
    UnexpectedToken {
        expected: &'static str,
        found: Token,
        position: Position,
    },

    /// `binary` precedence outside 1..=100 or not a whole number
    InvalidPrecedence { value: f64, position: Position },

    /// Operator prototype whose parameter count does not match its kind
    OperatorArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => write!(f, "expected {} at {}, found {}", expected, position, found),
            ParseError::InvalidPrecedence { value, position } => write!(
                f,
                "invalid precedence {} at {}: must be a whole number from {} to {}",
                value, position, MIN_PRECEDENCE, MAX_PRECEDENCE
            ),
            ParseError::OperatorArity {
                name,
                expected,
                found,
            } => write!(
                f,
                "invalid number of operands for operator '{}': expected {}, found {}",
                name, expected, found
            ),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Recursive-descent parser with precedence climbing for infix operators.
///
/// The parser holds a single lookahead token and no other state between
/// top-level constructs. Which characters are infix operators, and how
/// tightly they bind, is read from the [`OperatorTable`] passed to each call,
/// so operators declared by earlier input take effect immediately.
pub struct Parser<S: TokenSource = Lexer> {
    source: S,
    current_token: Token,
    position: Position,
    pending_error: Option<LexError>,
    stale: bool,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        let mut parser = Parser {
            source,
            current_token: Token::Eof,
            position: Position::default(),
            pending_error: None,
            stale: true,
        };
        if let Err(ParseError::Lex(e)) = parser.advance() {
            parser.pending_error = Some(e);
        }
        parser
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        // On a lex error the lookahead is stale until the next successful advance
        self.stale = true;
        self.current_token = self.source.next_token()?;
        self.position = self.source.position();
        self.stale = false;
        Ok(())
    }

    /// Drops the lookahead token, or the unreadable input that replaced it.
    /// Used by callers to resume after an error.
    pub fn skip_token(&mut self) {
        if let Err(ParseError::Lex(e)) = self.advance() {
            self.pending_error = Some(e);
        }
    }

    fn unexpected<T>(&self, expected: &'static str) -> Result<T, ParseError> {
        Err(ParseError::UnexpectedToken {
            expected,
            found: self.current_token.clone(),
            position: self.position,
        })
    }

    fn check_char(&self, c: char) -> bool {
        self.current_token == Token::Char(c)
    }

    fn expect_char(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if !self.check_char(c) {
            return self.unexpected(expected);
        }
        self.advance()
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParseError> {
        if self.current_token != token {
            return self.unexpected(expected);
        }
        self.advance()
    }

    fn expect_identifier(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match &self.current_token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => self.unexpected(expected),
        }
    }

    /// Parse primary expressions: numbers, variables, calls, '(' expr ')',
    /// and the keyword-introduced `if`, `for` and `var`
    fn parse_primary(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        match &self.current_token {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Identifier(_) => self.parse_identifier_expr(ops),
            Token::Char('(') => {
                self.advance()?;
                let expr = self.parse_expression(ops)?;
                self.expect_char(')', "')'")?;
                Ok(expr)
            }
            Token::If => self.parse_if(ops),
            Token::For => self.parse_for(ops),
            Token::Var => self.parse_var(ops),
            _ => self.unexpected("an expression"),
        }
    }

    fn parse_identifier_expr(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        let name = self.expect_identifier("identifier")?;

        if !self.check_char('(') {
            return Ok(Expr::Variable(name));
        }

        self.advance()?; // consume '('
        let mut args = vec![];
        if !self.check_char(')') {
            loop {
                args.push(self.parse_expression(ops)?);

                if self.check_char(')') {
                    break;
                }
                self.expect_char(',', "')' or ',' in argument list")?;
            }
        }
        self.advance()?; // consume ')'

        Ok(Expr::Call { callee: name, args })
    }

    fn parse_if(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        self.advance()?; // consume 'if'
        let cond = self.parse_expression(ops)?;

        self.expect(Token::Then, "'then'")?;
        let then = self.parse_expression(ops)?;

        self.expect(Token::Else, "'else'")?;
        let otherwise = self.parse_expression(ops)?;

        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_for(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        self.advance()?; // consume 'for'
        let var = self.expect_identifier("identifier after 'for'")?;

        self.expect_char('=', "'=' after for loop variable")?;
        let start = self.parse_expression(ops)?;

        self.expect_char(',', "',' after for start value")?;
        let end = self.parse_expression(ops)?;

        // The step is optional; lowering supplies 1.0 when absent
        let step = if self.check_char(',') {
            self.advance()?;
            Some(Box::new(self.parse_expression(ops)?))
        } else {
            None
        };

        self.expect(Token::In, "'in' after for")?;
        let body = self.parse_expression(ops)?;

        Ok(Expr::For {
            var,
            start: Box::new(start),
            end: Box::new(end),
            step,
            body: Box::new(body),
        })
    }

    fn parse_var(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        self.advance()?; // consume 'var'

        let mut bindings = vec![];
        loop {
            let name = self.expect_identifier("identifier after 'var'")?;

            let init = if self.check_char('=') {
                self.advance()?;
                Some(self.parse_expression(ops)?)
            } else {
                None
            };
            bindings.push((name, init));

            if !self.check_char(',') {
                break;
            }
            self.advance()?;
        }

        self.expect(Token::In, "'in' after var bindings")?;
        let body = self.parse_expression(ops)?;

        Ok(Expr::Var {
            bindings,
            body: Box::new(body),
        })
    }

    /// Parse a prefix operator chain, or a primary expression if the
    /// lookahead is not an operator character
    fn parse_unary(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        match self.current_token {
            Token::Char(c) if c != '(' && c != ')' && c != ',' => {
                self.advance()?;
                let operand = self.parse_unary(ops)?;
                Ok(Expr::unary(c, operand))
            }
            _ => self.parse_primary(ops),
        }
    }

    /// The lookahead as an infix operator, with its precedence.
    fn current_operator(&self, ops: &OperatorTable) -> Option<(char, u32)> {
        let symbol = self.current_token.as_char()?;
        ops.lookup(symbol).map(|precedence| (symbol, precedence))
    }

    /// Fold trailing infix operators onto `left`.
    ///
    /// Only operators binding at least as tightly as `min_precedence` are
    /// consumed. When the operator after the right operand binds strictly
    /// tighter, it is absorbed into the right operand first, which keeps
    /// equal precedence left-associative.
    fn parse_binop_rhs(
        &mut self,
        ops: &OperatorTable,
        min_precedence: u32,
        mut left: Expr,
    ) -> Result<Expr, ParseError> {
        loop {
            let (op, precedence) = match self.current_operator(ops) {
                Some((op, p)) if p >= min_precedence => (op, p),
                _ => return Ok(left),
            };
            self.advance()?;

            let mut right = self.parse_unary(ops)?;

            if let Some((_, next)) = self.current_operator(ops) {
                if precedence < next {
                    right = self.parse_binop_rhs(ops, precedence + 1, right)?;
                }
            }

            left = Expr::binary(op, left, right);
        }
    }

    pub fn parse_expression(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        let left = self.parse_unary(ops)?;
        self.parse_binop_rhs(ops, 0, left)
    }

    /// Parse a single expression that must span the whole input.
    pub fn parse(&mut self, ops: &OperatorTable) -> Result<Expr, ParseError> {
        if let Some(e) = self.pending_error.take() {
            return Err(ParseError::Lex(e));
        }
        if self.stale {
            self.advance()?;
        }
        let expr = self.parse_expression(ops)?;
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }
}

impl<S: TokenSource> Parser<S> {
    /// Parse the next top-level construct.
    ///
    /// Skips stray `;` separators and returns `Ok(None)` at end of input.
    pub fn parse_item(&mut self, ops: &OperatorTable) -> Result<Option<Item>, ParseError> {
        if let Some(e) = self.pending_error.take() {
            return Err(ParseError::Lex(e));
        }
        if self.stale {
            self.advance()?;
        }

        while self.check_char(';') {
            self.advance()?;
        }

        match self.current_token {
            Token::Eof => Ok(None),
            Token::Def => self.parse_definition(ops).map(|f| Some(Item::Definition(f))),
            Token::Extern => self.parse_extern().map(|p| Some(Item::Extern(p))),
            _ => self
                .parse_expression(ops)
                .map(|e| Some(Item::Expression(Function::anonymous(e)))),
        }
    }

    fn parse_definition(&mut self, ops: &OperatorTable) -> Result<Function, ParseError> {
        self.advance()?; // consume 'def'
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression(ops)?;
        Ok(Function { prototype, body })
    }

    fn parse_extern(&mut self) -> Result<Prototype, ParseError> {
        self.advance()?; // consume 'extern'
        self.parse_prototype()
    }

    fn expect_operator_symbol(&mut self) -> Result<char, ParseError> {
        match self.current_token {
            Token::Char(c) if c != '(' && c != ')' && c != ',' => {
                self.advance()?;
                Ok(c)
            }
            _ => self.unexpected("operator character"),
        }
    }

    /// Parse one of:
    ///
    /// ```text
    /// name(a b)
    /// unary!(v)
    /// binary| 5 (a b)
    /// ```
    fn parse_prototype(&mut self) -> Result<Prototype, ParseError> {
        let (name, operator) = match &self.current_token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                (name, None)
            }
            Token::Unary => {
                self.advance()?;
                let kind = OperatorKind::Unary(self.expect_operator_symbol()?);
                (kind.function_name(), Some(kind))
            }
            Token::Binary => {
                self.advance()?;
                let symbol = self.expect_operator_symbol()?;
                let precedence = match self.current_token {
                    Token::Number(value) => {
                        let precedence = self.validate_precedence(value)?;
                        self.advance()?;
                        precedence
                    }
                    _ => DEFAULT_BINARY_PRECEDENCE,
                };
                let kind = OperatorKind::Binary { symbol, precedence };
                (kind.function_name(), Some(kind))
            }
            _ => return self.unexpected("function name in prototype"),
        };

        self.expect_char('(', "'(' in prototype")?;

        let mut params = vec![];
        while let Token::Identifier(param) = &self.current_token {
            params.push(param.clone());
            self.advance()?;
        }

        self.expect_char(')', "')' in prototype")?;

        if let Some(kind) = operator {
            if params.len() != kind.arity() {
                return Err(ParseError::OperatorArity {
                    name,
                    expected: kind.arity(),
                    found: params.len(),
                });
            }
        }

        Ok(Prototype {
            name,
            params,
            operator,
        })
    }

    fn validate_precedence(&self, value: f64) -> Result<u32, ParseError> {
        let in_range = value >= MIN_PRECEDENCE as f64 && value <= MAX_PRECEDENCE as f64;
        if !in_range || value.fract() != 0.0 {
            return Err(ParseError::InvalidPrecedence {
                value,
                position: self.position,
            });
        }
        Ok(value as u32)
    }
}
