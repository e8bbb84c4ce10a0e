//! # Toy Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the toy language, a
//! tiny expression language in which every value is a 64-bit float and new
//! prefix and infix operators can be declared in the middle of a program.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, variables, operators, control flow)
//! - **[operators]** - Operator metadata for `unary`/`binary` declarations
//! - **[function]** - Prototypes and function definitions
//! - **[item]** - Top-level constructs handed to the driver
//!
//! ## Quick Start
//!
//! ```text
//! def fib(n) if n < 3 then 1 else fib(n - 1) + fib(n - 2);
//! fib(10);
//! ```
//!
//! The first line defines a function, the second is a bare expression that the
//! driver wraps in an anonymous function and executes.
//!
//! ## Core Concepts
//!
//! ### Everything Is an Expression
//!
//! Function bodies are single expressions. `if/then/else`, `for … in` and
//! `var … in` are expressions too; a loop always evaluates to `0.0`.
//!
//! ### User-Defined Operators
//!
//! Operators are ordinary functions with a special name:
//!
//! ```text
//! def unary-(v) 0 - v;
//! def binary> 10 (a b) b < a;
//! ```
//!
//! Declaring `binary>` installs `>` into the operator table with precedence 10,
//! after which `a > b` parses as an infix expression. Precedence defaults to 30
//! and must lie in 1..=100.
//!
//! ### Built-in Precedence
//!
//! | Operator | Precedence |
//! |----------|------------|
//! | `=`      | 2          |
//! | `<`      | 10         |
//! | `+` `-`  | 20         |
//! | `*`      | 40         |
//!
//! ### Mutable Locals
//!
//! Parameters, loop variables and `var` bindings are all assignable:
//!
//! ```text
//! def count(n) var acc = 0 in (for i = 0, i < n in acc = acc + 1) + acc;
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod function;
pub mod item;

pub use tokens::Token;
pub use expressions::Expr;
pub use operators::OperatorKind;
pub use function::{ANONYMOUS_FUNCTION, Function, Prototype};
pub use item::Item;
