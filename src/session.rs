//! Driver core: parse, lower and run top-level items.
//!
//! A [`Session`] keeps the operator table, the lowerer and the evaluator
//! alive across calls to [`Session::run`], so a REPL can feed it one line at
//! a time and operators or functions defined on one line are usable on the
//! next.

use std::{fmt, mem};

use crate::{
    ast::{Item, OperatorKind, Token},
    evaluator::{EvalError, Evaluator},
    ir::Module,
    lexer::Lexer,
    lower::{LowerError, LowerWarning, Lowerer},
    operators::OperatorTable,
    parser::{ParseError, Parser},
};

/// Any failure while handling a single top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Parse(ParseError),
    Lower(LowerError),
    Eval(EvalError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Parse(e) => write!(f, "Parse error: {}", e),
            SessionError::Lower(e) => write!(f, "Error: {}", e),
            SessionError::Eval(e) => write!(f, "Evaluation error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Parse(e) => Some(e),
            SessionError::Lower(e) => Some(e),
            SessionError::Eval(e) => Some(e),
        }
    }
}

impl From<ParseError> for SessionError {
    fn from(e: ParseError) -> Self {
        SessionError::Parse(e)
    }
}

impl From<LowerError> for SessionError {
    fn from(e: LowerError) -> Self {
        SessionError::Lower(e)
    }
}

impl From<EvalError> for SessionError {
    fn from(e: EvalError) -> Self {
        SessionError::Eval(e)
    }
}

/// Options for a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Lower items without running them; lowered modules are kept for
    /// [`Session::take_modules`]
    pub compile_only: bool,
}

/// What happened to one top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A `def` was lowered
    Defined(String),
    /// An `extern` was registered
    Declared(String),
    /// A top-level expression ran and produced a value
    Evaluated(f64),
    /// A top-level expression was lowered but not run (compile-only sessions)
    Lowered(String),
    Failed(SessionError),
}

#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    operators: OperatorTable,
    lowerer: Lowerer,
    evaluator: Evaluator,
    modules: Vec<Module>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Session {
            options,
            operators: OperatorTable::new(),
            lowerer: Lowerer::new("toy"),
            evaluator: Evaluator::new(),
            modules: Vec::new(),
        }
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    pub fn lowerer(&self) -> &Lowerer {
        &self.lowerer
    }

    /// Handles every item in `source`, one outcome per item.
    ///
    /// A parse error is reported and the offending token skipped; parsing
    /// resumes at whatever follows.
    pub fn run(&mut self, source: &str) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        self.run_with(source, |_, outcome| outcomes.push(outcome));
        outcomes
    }

    /// Like [`run`](Self::run), but hands each outcome to `on_item` as soon
    /// as the item is done, along with the session.
    pub fn run_with(&mut self, source: &str, mut on_item: impl FnMut(&mut Self, Outcome)) {
        let mut parser = Parser::new(Lexer::new(source));

        loop {
            match parser.parse_item(&self.operators) {
                Ok(None) => break,
                Ok(Some(item)) => {
                    let outcome = match self.handle(&item) {
                        Ok(outcome) => outcome,
                        Err(e) => Outcome::Failed(e),
                    };
                    on_item(self, outcome);
                }
                Err(e) => {
                    on_item(self, Outcome::Failed(e.into()));
                    parser.skip_token();
                }
            }
        }
    }

    /// Whether `source` stops partway through an item, so a line-oriented
    /// front end should read more before running it.
    ///
    /// Operators defined earlier in `source` are assumed to lower cleanly.
    /// Any other parse error counts as complete and is left for
    /// [`run`](Self::run) to report.
    pub fn is_incomplete(&self, source: &str) -> bool {
        let mut ops = self.operators.clone();
        let mut parser = Parser::new(Lexer::new(source));

        loop {
            match parser.parse_item(&ops) {
                Ok(None) => return false,
                Ok(Some(item)) => assume_operator(&mut ops, &item),
                Err(ParseError::UnexpectedToken {
                    found: Token::Eof, ..
                }) => return true,
                Err(_) => parser.skip_token(),
            }
        }
    }

    fn handle(&mut self, item: &Item) -> Result<Outcome, SessionError> {
        let signature = self.lowerer.lower_item(item, &mut self.operators)?;
        let module = self.lowerer.take_module();

        match item {
            Item::Definition(_) => {
                self.emit(module);
                Ok(Outcome::Defined(signature.name))
            }
            Item::Extern(_) => {
                self.emit(module);
                Ok(Outcome::Declared(signature.name))
            }
            Item::Expression(_) => {
                self.lowerer.forget(&signature.name);
                if self.options.compile_only {
                    self.modules.push(module);
                    return Ok(Outcome::Lowered(signature.name));
                }

                self.evaluator.add_module(module);
                let result = self.evaluator.call(&signature.name, &[]);
                self.evaluator.remove_function(&signature.name);
                Ok(Outcome::Evaluated(result?))
            }
        }
    }

    fn emit(&mut self, module: Module) {
        if self.options.compile_only {
            self.modules.push(module);
        } else {
            self.evaluator.add_module(module);
        }
    }

    /// Modules lowered by a compile-only session, one per item.
    pub fn take_modules(&mut self) -> Vec<Module> {
        mem::take(&mut self.modules)
    }

    pub fn take_warnings(&mut self) -> Vec<LowerWarning> {
        self.lowerer.take_warnings()
    }

    /// Text written by `putchard` and `printd` since the last call.
    pub fn take_output(&mut self) -> String {
        self.evaluator.take_output()
    }
}

/// Installs the precedence of a parsed `binary` definition without lowering it.
pub(crate) fn assume_operator(ops: &mut OperatorTable, item: &Item) {
    if let Item::Definition(function) = item {
        if let Some(OperatorKind::Binary { symbol, precedence }) = function.prototype.operator {
            ops.install(symbol, precedence);
        }
    }
}
