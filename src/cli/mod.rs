//! CLI support for toy-lang
//!
//! Provides programmatic access to the `toy` subcommands so they can be
//! embedded in other tools or driven from tests without spawning a process.

mod check;
mod run;

pub use check::{CheckFormat, CheckOptions, CheckResult, execute_check};
pub use run::{RunEntry, RunReport, execute_run};

use std::io;

use crate::session::SessionError;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Items rejected by `check`, in source order
    Check(Vec<SessionError>),
    /// Number of items that failed during `run`; each was already reported
    ItemsFailed(usize),
    /// IO error
    Io(io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Check(errors) => {
                let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", lines.join("\n"))
            }
            CliError::ItemsFailed(1) => write!(f, "1 item failed"),
            CliError::ItemsFailed(n) => write!(f, "{} items failed", n),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Check(errors) => errors.first().map(|e| e as &(dyn std::error::Error + 'static)),
            CliError::Io(e) => Some(e),
            CliError::ItemsFailed(_) => None,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
