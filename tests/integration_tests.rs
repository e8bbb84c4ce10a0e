use std::error::Error;

use toy_lang::{
    cli::{self, CheckFormat, CheckOptions, CheckResult, CliError},
    lexer::LexError,
    lower::{LowerError, LowerWarning},
    output::{module_to_json, to_json_pretty},
    parser::ParseError,
    session::{Outcome, Session, SessionError, SessionOptions},
};

fn check(source: &str) -> Result<CheckResult, CliError> {
    cli::execute_check(&CheckOptions {
        source: source.to_string(),
        ..Default::default()
    })
}

fn check_syntax(source: &str) -> Result<CheckResult, CliError> {
    cli::execute_check(&CheckOptions {
        source: source.to_string(),
        format: CheckFormat::Text,
        syntax_only: true,
    })
}

// ============================================================================
// Session driver
// ============================================================================

#[test]
fn test_outcome_per_item() {
    let mut session = Session::default();
    let outcomes = session.run("extern sin(x); def two() 2; two() * 3");
    assert_eq!(
        outcomes,
        vec![
            Outcome::Declared("sin".to_string()),
            Outcome::Defined("two".to_string()),
            Outcome::Evaluated(6.0),
        ]
    );
}

#[test]
fn test_state_carries_across_runs() {
    let mut session = Session::default();
    session.run("def binary% 40 (a b) a - b * 0");
    assert_eq!(session.operators().lookup('%'), Some(40));
    assert_eq!(session.run("7 % 3"), vec![Outcome::Evaluated(7.0)]);
}

#[test]
fn test_parse_error_skips_one_token() {
    let mut session = Session::default();
    let outcomes = session.run("def 1 ; 4");

    assert_eq!(outcomes.len(), 2);
    match &outcomes[0] {
        Outcome::Failed(e) => assert_eq!(
            e.to_string(),
            "Parse error: expected function name in prototype at 1:5, found number 1"
        ),
        other => panic!("Expected parse failure, got {:?}", other),
    }
    assert_eq!(outcomes[1], Outcome::Evaluated(4.0));
}

#[test]
fn test_lex_error_is_recovered() {
    let mut session = Session::default();
    let outcomes = session.run("1 + é; 3");

    assert!(matches!(
        &outcomes[0],
        Outcome::Failed(SessionError::Parse(ParseError::Lex(LexError::UnexpectedChar { ch: 'é', .. })))
    ));
    assert_eq!(outcomes.last(), Some(&Outcome::Evaluated(3.0)));
}

#[test]
fn test_lowering_error_does_not_poison_session() {
    let mut session = Session::default();
    let outcomes = session.run("def f(x) x + y; def f(x) x + 1; f(1)");

    assert_eq!(
        outcomes,
        vec![
            Outcome::Failed(SessionError::Lower(LowerError::UnknownVariable(
                "y".to_string()
            ))),
            Outcome::Defined("f".to_string()),
            Outcome::Evaluated(2.0),
        ]
    );
}

#[test]
fn test_session_error_source() {
    let err = SessionError::Lower(LowerError::AssignmentTarget);
    assert_eq!(err.to_string(), "Error: assignment target must be a variable");
    assert_eq!(
        err.source().map(|e| e.to_string()),
        Some("assignment target must be a variable".to_string())
    );
}

#[test]
fn test_compile_only_session_runs_nothing() {
    let mut session = Session::new(SessionOptions { compile_only: true });
    let outcomes = session.run("extern putchard(c); putchard(65)");

    assert_eq!(outcomes[1], Outcome::Lowered("__anon_expr".to_string()));
    assert_eq!(session.take_output(), "");
    assert_eq!(session.take_modules().len(), 2);
}

// ============================================================================
// `toy run`
// ============================================================================

#[test]
fn test_run_keeps_output_with_its_item() {
    let mut session = Session::default();
    let report = cli::execute_run(
        &mut session,
        "extern putchard(c); putchard(65); putchard(66)",
    );

    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.entries[0].output, "");
    assert_eq!(report.entries[1].output, "A");
    assert_eq!(report.entries[2].output, "B");
    assert_eq!(report.failures(), 0);
}

#[test]
fn test_run_counts_failures() {
    let mut session = Session::default();
    let report = cli::execute_run(&mut session, "foo(1); 2; def 1");

    assert_eq!(report.failures(), 2);
    assert_eq!(report.entries[1].outcome, Outcome::Evaluated(2.0));
}

#[test]
fn test_run_reports_warnings_with_item() {
    let mut session = Session::default();
    let report = cli::execute_run(&mut session, "extern f(a); def f(a b) a; f(1, 2)");

    assert!(report.entries[0].warnings.is_empty());
    assert_eq!(
        report.entries[1].warnings,
        vec![LowerWarning::SignatureMismatch {
            name: "f".to_string(),
            declared: 1,
            defined: 2,
        }]
    );
    assert_eq!(report.entries[2].outcome, Outcome::Evaluated(1.0));
}

#[test]
fn test_definition_split_across_lines() {
    let lines = [
        "def fib(n)\n",
        "  if n < 3 then 1\n",
        "  else fib(n - 1) + fib(n - 2)\n",
        "fib(10)\n",
    ];

    let mut session = Session::default();
    let mut pending = String::new();
    let mut outcomes = Vec::new();
    for line in lines {
        pending.push_str(line);
        if session.is_incomplete(&pending) {
            continue;
        }
        let report = cli::execute_run(&mut session, &pending);
        outcomes.extend(report.entries.into_iter().map(|e| e.outcome));
        pending.clear();
    }

    assert!(pending.is_empty());
    assert_eq!(
        outcomes,
        vec![Outcome::Defined("fib".to_string()), Outcome::Evaluated(55.0)]
    );
}

#[test]
fn test_first_line_alone_is_not_run() {
    let mut session = Session::default();
    assert!(session.is_incomplete("def f(x)\n"));
    // Running it anyway is what a line-at-a-time driver must avoid
    assert!(matches!(
        session.run("def f(x)\n").as_slice(),
        [Outcome::Failed(SessionError::Parse(_))]
    ));
}

// ============================================================================
// `toy check`
// ============================================================================

#[test]
fn test_check_lowers_every_item() {
    match check("def add(a b) a + b; add(1, 2)").unwrap() {
        CheckResult::Lowered { modules, warnings } => {
            assert!(warnings.is_empty());
            assert_eq!(modules.len(), 2);
            assert!(modules[0].get_function("add").is_some());
            assert!(modules[1].get_function("__anon_expr").is_some());
            assert_eq!(modules[1].declarations[0].name, "add");
        }
        other => panic!("Expected lowered modules, got {:?}", other),
    }
}

#[test]
fn test_check_text_listing() {
    match check("def neg(x) 0 - x").unwrap() {
        CheckResult::Lowered { modules, .. } => {
            let listing = modules[0].to_string();
            assert!(listing.starts_with("; module toy\n"));
            assert!(listing.contains("define @neg(%x) {"));
            assert!(listing.contains("= fsub "));
        }
        other => panic!("Expected lowered modules, got {:?}", other),
    }
}

#[test]
fn test_check_json_listing() {
    let modules = match check("extern sin(x); def f(x) if x then sin(x) else 0").unwrap() {
        CheckResult::Lowered { modules, .. } => modules,
        other => panic!("Expected lowered modules, got {:?}", other),
    };

    let declared = module_to_json(&modules[0]);
    assert_eq!(declared["declarations"][0]["name"], "sin");
    assert_eq!(declared["declarations"][0]["params"][0], "x");

    let defined = module_to_json(&modules[1]);
    let f = &defined["functions"][0];
    assert_eq!(f["name"], "f");
    assert_eq!(f["entry"], "b0");
    let labels: Vec<&str> = f["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["entry", "then", "else", "ifcont"]);
    assert!(f["value_types"].as_array().unwrap().contains(&"bool".into()));

    assert!(to_json_pretty(&modules[1]).contains("\n  \"functions\": ["));
}

#[test]
fn test_check_collects_all_errors() {
    let err = check("def f(x) y; def g(x) z").unwrap_err();
    match &err {
        CliError::Check(errors) => assert_eq!(errors.len(), 2),
        other => panic!("Expected check errors, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Error: unknown variable 'y'\nError: unknown variable 'z'"
    );
    assert!(err.source().is_some());
}

#[test]
fn test_check_reports_warnings() {
    match check("extern f(a); def f(a b) a").unwrap() {
        CheckResult::Lowered { warnings, .. } => assert_eq!(warnings.len(), 1),
        other => panic!("Expected lowered modules, got {:?}", other),
    }
}

#[test]
fn test_syntax_only_installs_operators() {
    match check_syntax("def binary| 5 (a b) a; 1 | 2 | 3").unwrap() {
        CheckResult::SyntaxValid { items } => assert_eq!(items, 2),
        other => panic!("Expected valid syntax, got {:?}", other),
    }
}

#[test]
fn test_syntax_only_does_not_resolve_names() {
    assert!(matches!(
        check_syntax("def f(x) y"),
        Ok(CheckResult::SyntaxValid { items: 1 })
    ));
}

#[test]
fn test_syntax_only_reports_parse_errors() {
    let err = check_syntax("def (x) 1").unwrap_err();
    assert!(matches!(
        &err,
        CliError::Check(errors) if matches!(errors[0], SessionError::Parse(_))
    ));
}

#[test]
fn test_cli_error_messages() {
    assert_eq!(CliError::ItemsFailed(1).to_string(), "1 item failed");
    assert_eq!(CliError::ItemsFailed(3).to_string(), "3 items failed");
}
