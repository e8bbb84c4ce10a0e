//! Execute toy programs

use crate::{
    lower::LowerWarning,
    session::{Outcome, Session},
};

/// One handled item and everything it produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub outcome: Outcome,
    /// Text written by `putchard`/`printd` while the item ran
    pub output: String,
    pub warnings: Vec<LowerWarning>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub entries: Vec<RunEntry>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed(_)))
            .count()
    }
}

/// Runs `source` in `session`, keeping each item's output next to its outcome.
pub fn execute_run(session: &mut Session, source: &str) -> RunReport {
    let mut report = RunReport::default();
    session.run_with(source, |session, outcome| {
        report.entries.push(RunEntry {
            outcome,
            output: session.take_output(),
            warnings: session.take_warnings(),
        });
    });
    report
}
