use std::fmt;

use crate::ast::Token;

/// Line and column (both 1-based) of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors that can occur while scanning characters into tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// Digits and dots that do not form a number, e.g. `1.2.3`
    InvalidNumber { text: String, position: Position },

    /// Character outside the ASCII range
    UnexpectedChar { ch: char, position: Position },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::InvalidNumber { text, position } => {
                write!(f, "invalid number literal '{}' at {}", text, position)
            }
            LexError::UnexpectedChar { ch, position } => {
                write!(f, "unexpected character '{}' at {}", ch, position)
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Anything the parser can pull tokens from.
///
/// A source is restartable only by building a new one over the same input.
/// End of input is [`Token::Eof`], never an error, and is returned again on
/// every further call.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexError>;

    /// Where the most recently returned token starts.
    fn position(&self) -> Position;
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    token_start: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            token_start: Position { line: 1, column: 1 },
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        number
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| LexError::InvalidNumber {
                text: number,
                position: self.token_start,
            })
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            if self.current_char() == Some('#') {
                self.skip_comment();
            } else {
                break;
            }
        }

        self.token_start = self.here();

        match self.current_char() {
            None => Ok(Token::Eof),
            Some(ch) if ch.is_ascii_alphabetic() => {
                let ident = self.read_identifier();

                Ok(match ident.as_str() {
                    "def" => Token::Def,
                    "extern" => Token::Extern,
                    "if" => Token::If,
                    "then" => Token::Then,
                    "else" => Token::Else,
                    "for" => Token::For,
                    "in" => Token::In,
                    "var" => Token::Var,
                    "unary" => Token::Unary,
                    "binary" => Token::Binary,
                    _ => Token::Identifier(ident),
                })
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(),
            Some(ch) if ch.is_ascii() => {
                self.advance();
                Ok(Token::Char(ch))
            }
            Some(ch) => {
                self.advance();
                Err(LexError::UnexpectedChar {
                    ch,
                    position: self.token_start,
                })
            }
        }
    }

    /// Where the most recently returned token starts.
    pub fn position(&self) -> Position {
        self.token_start
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Result<Token, LexError> {
        Lexer::next_token(self)
    }

    fn position(&self) -> Position {
        Lexer::position(self)
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("def extern if then else for in var unary binary");
    assert_eq!(lexer.next_token(), Ok(Token::Def));
    assert_eq!(lexer.next_token(), Ok(Token::Extern));
    assert_eq!(lexer.next_token(), Ok(Token::If));
    assert_eq!(lexer.next_token(), Ok(Token::Then));
    assert_eq!(lexer.next_token(), Ok(Token::Else));
    assert_eq!(lexer.next_token(), Ok(Token::For));
    assert_eq!(lexer.next_token(), Ok(Token::In));
    assert_eq!(lexer.next_token(), Ok(Token::Var));
    assert_eq!(lexer.next_token(), Ok(Token::Unary));
    assert_eq!(lexer.next_token(), Ok(Token::Binary));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_operator_declaration() {
    let mut lexer = Lexer::new("def binary| 5 (a b)");
    assert_eq!(lexer.next_token(), Ok(Token::Def));
    assert_eq!(lexer.next_token(), Ok(Token::Binary));
    assert_eq!(lexer.next_token(), Ok(Token::Char('|')));
    assert_eq!(lexer.next_token(), Ok(Token::Number(5.0)));
    assert_eq!(lexer.next_token(), Ok(Token::Char('(')));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("a".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("b".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Char(')')));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}
