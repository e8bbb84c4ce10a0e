// tests/parser_tests.rs

use toy_lang::ast::{Expr, Item, OperatorKind, Prototype, Token};
use toy_lang::lexer::{LexError, Lexer, Position, TokenSource};
use toy_lang::operators::OperatorTable;
use toy_lang::parser::{ParseError, Parser};

fn parse_with(input: &str, ops: &OperatorTable) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(Lexer::new(input));
    parser.parse(ops)
}

fn parse(input: &str) -> Expr {
    parse_with(input, &OperatorTable::new()).unwrap()
}

fn items(input: &str, ops: &OperatorTable) -> Vec<Result<Item, ParseError>> {
    let mut parser = Parser::new(Lexer::new(input));
    let mut result = vec![];
    loop {
        match parser.parse_item(ops) {
            Ok(None) => break,
            Ok(Some(item)) => result.push(Ok(item)),
            Err(e) => {
                result.push(Err(e));
                parser.skip_token();
            }
        }
    }
    result
}

fn num(n: f64) -> Expr {
    Expr::Number(n)
}

fn var(name: &str) -> Expr {
    Expr::Variable(name.to_string())
}

/// Token source over a fixed list, for driving the parser without text.
struct TokenList {
    tokens: Vec<Token>,
    next: usize,
}

impl TokenSource for TokenList {
    fn next_token(&mut self) -> Result<Token, LexError> {
        let token = self.tokens.get(self.next).cloned().unwrap_or(Token::Eof);
        self.next += 1;
        Ok(token)
    }

    fn position(&self) -> Position {
        Position {
            line: 1,
            column: self.next,
        }
    }
}

// ============================================================================
// Built-in precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter() {
    // 1 + (2 * 3)
    assert_eq!(
        parse("1 + 2 * 3"),
        Expr::binary('+', num(1.0), Expr::binary('*', num(2.0), num(3.0)))
    );
}

#[test]
fn test_equal_precedence_is_left_associative() {
    // (1 - 2) - 3
    assert_eq!(
        parse("1 - 2 - 3"),
        Expr::binary('-', Expr::binary('-', num(1.0), num(2.0)), num(3.0))
    );
}

#[test]
fn test_mixed_precedence_chain() {
    // a < ((b * c) + d)
    assert_eq!(
        parse("a < b * c + d"),
        Expr::binary(
            '<',
            var("a"),
            Expr::binary('+', Expr::binary('*', var("b"), var("c")), var("d"))
        )
    );
}

#[test]
fn test_assignment_binds_loosest() {
    // x = (y + 1)
    assert_eq!(
        parse("x = y + 1"),
        Expr::binary('=', var("x"), Expr::binary('+', var("y"), num(1.0)))
    );
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(
        parse("(1 + 2) * 3"),
        Expr::binary('*', Expr::binary('+', num(1.0), num(2.0)), num(3.0))
    );
}

// ============================================================================
// User-defined operators
// ============================================================================

#[test]
fn test_installed_operator_is_left_associative() {
    let mut ops = OperatorTable::new();
    ops.install('|', 5);

    // (a | b) | c
    assert_eq!(
        parse_with("a | b | c", &ops).unwrap(),
        Expr::binary('|', Expr::binary('|', var("a"), var("b")), var("c"))
    );

    // (x < y) | z
    assert_eq!(
        parse_with("x < y | z", &ops).unwrap(),
        Expr::binary('|', Expr::binary('<', var("x"), var("y")), var("z"))
    );
}

#[test]
fn test_high_precedence_operator() {
    let mut ops = OperatorTable::new();
    ops.install('^', 50);

    // 1 + (2 * (3 ^ 4))
    assert_eq!(
        parse_with("1 + 2 * 3 ^ 4", &ops).unwrap(),
        Expr::binary(
            '+',
            num(1.0),
            Expr::binary('*', num(2.0), Expr::binary('^', num(3.0), num(4.0)))
        )
    );
}

#[test]
fn test_unknown_operator_ends_expression() {
    let err = parse_with("a | b", &OperatorTable::new()).unwrap_err();
    assert_eq!(
        err,
        ParseError::UnexpectedToken {
            expected: "end of input",
            found: Token::Char('|'),
            position: Position { line: 1, column: 3 },
        }
    );
}

#[test]
fn test_operator_table_is_read_per_call() {
    let mut ops = OperatorTable::new();
    let mut parser = Parser::new(Lexer::new("a & b; a & b"));

    // Not yet an infix operator: `a` ends the item and `& b` starts the next
    let first = parser.parse_item(&ops).unwrap().unwrap();
    assert!(matches!(first, Item::Expression(f) if f.body == var("a")));
    let second = parser.parse_item(&ops).unwrap().unwrap();
    assert!(matches!(second, Item::Expression(f) if f.body == Expr::unary('&', var("b"))));

    ops.install('&', 6);
    let last = parser.parse_item(&ops).unwrap().unwrap();
    assert!(matches!(last, Item::Expression(f) if f.body == Expr::binary('&', var("a"), var("b"))));
}

// ============================================================================
// Prefix operators
// ============================================================================

#[test]
fn test_prefix_operator() {
    assert_eq!(parse("!x"), Expr::unary('!', var("x")));
}

#[test]
fn test_prefix_binds_tighter_than_infix() {
    // (-a) * b
    assert_eq!(
        parse("-a * b"),
        Expr::binary('*', Expr::unary('-', var("a")), var("b"))
    );
}

#[test]
fn test_prefix_after_infix() {
    assert_eq!(
        parse("a - -b"),
        Expr::binary('-', var("a"), Expr::unary('-', var("b")))
    );
}

// ============================================================================
// Primary expressions
// ============================================================================

#[test]
fn test_call_arguments() {
    assert_eq!(
        parse("f()"),
        Expr::Call {
            callee: "f".to_string(),
            args: vec![],
        }
    );
    assert_eq!(
        parse("g(1, x + 2)"),
        Expr::Call {
            callee: "g".to_string(),
            args: vec![num(1.0), Expr::binary('+', var("x"), num(2.0))],
        }
    );
}

#[test]
fn test_call_missing_comma() {
    let err = parse_with("f(1 2)", &OperatorTable::new()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnexpectedToken {
            expected: "')' or ',' in argument list",
            found: Token::Number(n),
            ..
        } if n == 2.0
    ));
}

#[test]
fn test_if_expression() {
    assert_eq!(
        parse("if x < 3 then 1 else f(x)"),
        Expr::If {
            cond: Box::new(Expr::binary('<', var("x"), num(3.0))),
            then: Box::new(num(1.0)),
            otherwise: Box::new(Expr::Call {
                callee: "f".to_string(),
                args: vec![var("x")],
            }),
        }
    );
}

#[test]
fn test_if_requires_then() {
    let err = parse_with("if x 1 else 2", &OperatorTable::new()).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { expected: "'then'", .. }));
}

#[test]
fn test_for_with_and_without_step() {
    assert_eq!(
        parse("for i = 1, i < 10, 2 in f(i)"),
        Expr::For {
            var: "i".to_string(),
            start: Box::new(num(1.0)),
            end: Box::new(Expr::binary('<', var("i"), num(10.0))),
            step: Some(Box::new(num(2.0))),
            body: Box::new(Expr::Call {
                callee: "f".to_string(),
                args: vec![var("i")],
            }),
        }
    );

    match parse("for i = 0, i < n in 0") {
        Expr::For { step, .. } => assert!(step.is_none()),
        other => panic!("Expected for loop, got {:?}", other),
    }
}

#[test]
fn test_for_requires_in() {
    let err = parse_with("for i = 0, i < 3 i", &OperatorTable::new()).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { expected: "'in' after for", .. }));
}

#[test]
fn test_var_bindings() {
    assert_eq!(
        parse("var a = 1, b, c = a in a + b"),
        Expr::Var {
            bindings: vec![
                ("a".to_string(), Some(num(1.0))),
                ("b".to_string(), None),
                ("c".to_string(), Some(var("a"))),
            ],
            body: Box::new(Expr::binary('+', var("a"), var("b"))),
        }
    );
}

#[test]
fn test_var_requires_identifier() {
    let err = parse_with("var 1 in 2", &OperatorTable::new()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::UnexpectedToken {
            expected: "identifier after 'var'",
            ..
        }
    ));
}

#[test]
fn test_missing_expression() {
    let err = parse_with(")", &OperatorTable::new()).unwrap_err();
    assert_eq!(err.to_string(), "expected an expression at 1:1, found ')'");
}

// ============================================================================
// Top-level items
// ============================================================================

#[test]
fn test_definition_item() {
    let parsed = items("def add(a b) a + b", &OperatorTable::new());
    assert_eq!(parsed.len(), 1);
    match &parsed[0] {
        Ok(Item::Definition(f)) => {
            assert_eq!(f.prototype, Prototype::new("add", vec!["a".into(), "b".into()]));
            assert_eq!(f.body, Expr::binary('+', var("a"), var("b")));
        }
        other => panic!("Expected definition, got {:?}", other),
    }
}

#[test]
fn test_extern_item() {
    let parsed = items("extern sin(x)", &OperatorTable::new());
    assert_eq!(
        parsed,
        vec![Ok(Item::Extern(Prototype::new("sin", vec!["x".into()])))]
    );
}

#[test]
fn test_expression_item_is_anonymous() {
    let parsed = items("1 + 2", &OperatorTable::new());
    match &parsed[0] {
        Ok(Item::Expression(f)) => {
            assert!(f.is_anonymous());
            assert_eq!(f.name(), "__anon_expr");
            assert!(f.prototype.params.is_empty());
        }
        other => panic!("Expected expression, got {:?}", other),
    }
}

#[test]
fn test_semicolons_are_skipped() {
    let parsed = items(";; def f() 1 ; ; f() ;", &OperatorTable::new());
    assert_eq!(parsed.len(), 2);
    assert!(matches!(parsed[0], Ok(Item::Definition(_))));
    assert!(matches!(parsed[1], Ok(Item::Expression(_))));
}

#[test]
fn test_empty_input_has_no_items() {
    assert!(items("", &OperatorTable::new()).is_empty());
    assert!(items("  # only a comment", &OperatorTable::new()).is_empty());
}

#[test]
fn test_recovery_skips_one_token() {
    let parsed = items("def 1; 2", &OperatorTable::new());
    assert_eq!(parsed.len(), 2);
    assert!(matches!(
        parsed[0],
        Err(ParseError::UnexpectedToken {
            expected: "function name in prototype",
            ..
        })
    ));
    assert!(matches!(&parsed[1], Ok(Item::Expression(f)) if f.body == num(2.0)));
}

// ============================================================================
// Operator prototypes
// ============================================================================

#[test]
fn test_binary_prototype_with_precedence() {
    let parsed = items("def binary| 5 (a b) if a then 1 else b", &OperatorTable::new());
    match &parsed[0] {
        Ok(Item::Definition(f)) => {
            assert_eq!(f.name(), "binary|");
            assert_eq!(
                f.prototype.operator,
                Some(OperatorKind::Binary {
                    symbol: '|',
                    precedence: 5,
                })
            );
            assert_eq!(f.prototype.binary_precedence(), Some(5));
        }
        other => panic!("Expected definition, got {:?}", other),
    }
}

#[test]
fn test_binary_prototype_default_precedence() {
    let parsed = items("def binary%(a b) a", &OperatorTable::new());
    match &parsed[0] {
        Ok(Item::Definition(f)) => assert_eq!(f.prototype.binary_precedence(), Some(30)),
        other => panic!("Expected definition, got {:?}", other),
    }
}

#[test]
fn test_unary_prototype() {
    let parsed = items("def unary!(v) if v then 0 else 1", &OperatorTable::new());
    match &parsed[0] {
        Ok(Item::Definition(f)) => {
            assert_eq!(f.name(), "unary!");
            assert!(f.prototype.is_unary_op());
            assert_eq!(f.prototype.operator, Some(OperatorKind::Unary('!')));
        }
        other => panic!("Expected definition, got {:?}", other),
    }
}

#[test]
fn test_operator_arity_is_checked() {
    let parsed = items("def unary!(a b) a", &OperatorTable::new());
    assert_eq!(
        parsed[0],
        Err(ParseError::OperatorArity {
            name: "unary!".to_string(),
            expected: 1,
            found: 2,
        })
    );

    let parsed = items("extern binary& 7 (a)", &OperatorTable::new());
    assert!(matches!(
        parsed[0],
        Err(ParseError::OperatorArity {
            expected: 2,
            found: 1,
            ..
        })
    ));
}

#[test]
fn test_precedence_bounds() {
    for ok in ["1", "100", "42"] {
        let source = format!("extern binary| {} (a b)", ok);
        assert!(items(&source, &OperatorTable::new())[0].is_ok(), "{}", ok);
    }

    for bad in ["0", "101", "2.5"] {
        let source = format!("extern binary| {} (a b)", bad);
        assert!(
            matches!(
                items(&source, &OperatorTable::new())[0],
                Err(ParseError::InvalidPrecedence { .. })
            ),
            "{}",
            bad
        );
    }
}

#[test]
fn test_prototype_params_are_whitespace_separated() {
    let parsed = items("def f(a, b) a", &OperatorTable::new());
    assert!(matches!(
        parsed[0],
        Err(ParseError::UnexpectedToken {
            expected: "')' in prototype",
            found: Token::Char(','),
            ..
        })
    ));
}

// ============================================================================
// Token sources and lex errors
// ============================================================================

#[test]
fn test_parser_over_token_list() {
    let source = TokenList {
        tokens: vec![
            Token::Identifier("x".to_string()),
            Token::Char('*'),
            Token::Number(2.0),
        ],
        next: 0,
    };
    let mut parser = Parser::new(source);
    assert_eq!(
        parser.parse(&OperatorTable::new()),
        Ok(Expr::binary('*', var("x"), num(2.0)))
    );
}

#[test]
fn test_lex_error_is_reported_and_skipped() {
    let parsed = items("1 + 2..3; 4", &OperatorTable::new());
    assert!(matches!(
        parsed[0],
        Err(ParseError::Lex(LexError::InvalidNumber { .. }))
    ));
    assert!(matches!(parsed.last(), Some(Ok(Item::Expression(f))) if f.body == num(4.0)));
}
