//! Lower a program without running it

use super::CliError;
use crate::{
    ir::Module,
    lexer::Lexer,
    lower::LowerWarning,
    operators::OperatorTable,
    parser::Parser,
    session::{Outcome, Session, SessionError, SessionOptions, assume_operator},
};

/// How `check` prints lowered IR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckFormat {
    #[default]
    Text,
    Json,
}

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Program source
    pub source: String,
    /// Output format for the lowered IR
    pub format: CheckFormat,
    /// Only validate syntax, don't lower
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Every item parsed
    SyntaxValid { items: usize },
    /// Every item lowered; one module per item
    Lowered {
        modules: Vec<Module>,
        warnings: Vec<LowerWarning>,
    },
}

/// Execute a toy check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        return check_syntax(&options.source);
    }

    let mut session = Session::new(SessionOptions { compile_only: true });
    let errors: Vec<SessionError> = session
        .run(&options.source)
        .into_iter()
        .filter_map(|outcome| match outcome {
            Outcome::Failed(e) => Some(e),
            _ => None,
        })
        .collect();

    if !errors.is_empty() {
        return Err(CliError::Check(errors));
    }

    Ok(CheckResult::Lowered {
        modules: session.take_modules(),
        warnings: session.take_warnings(),
    })
}

/// Parses without lowering. Operator definitions are assumed to succeed, so
/// their precedence is installed as soon as they parse.
fn check_syntax(source: &str) -> Result<CheckResult, CliError> {
    let mut ops = OperatorTable::new();
    let mut parser = Parser::new(Lexer::new(source));
    let mut errors = Vec::new();
    let mut items = 0;

    loop {
        match parser.parse_item(&ops) {
            Ok(None) => break,
            Ok(Some(item)) => {
                items += 1;
                assume_operator(&mut ops, &item);
            }
            Err(e) => {
                errors.push(SessionError::Parse(e));
                parser.skip_token();
            }
        }
    }

    if !errors.is_empty() {
        return Err(CliError::Check(errors));
    }
    Ok(CheckResult::SyntaxValid { items })
}
