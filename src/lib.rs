pub mod ast;
pub mod cli;
pub mod evaluator;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod operators;
pub mod output;
pub mod parser;
pub mod prototypes;
pub mod scope;
pub mod session;
pub mod value;

pub use ast::{Expr, Function, Item, OperatorKind, Prototype, Token};
pub use evaluator::{EvalError, Evaluator};
pub use ir::Module;
pub use lexer::{LexError, Lexer, Position, TokenSource};
pub use lower::{LowerError, LowerWarning, Lowerer};
pub use operators::OperatorTable;
pub use output::{module_to_json, to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use session::{Outcome, Session, SessionError, SessionOptions};
pub use value::Value;
