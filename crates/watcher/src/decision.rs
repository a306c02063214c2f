//! How the user's accept/decline answer is obtained.

use anyhow::{Context, Result};
use dialoguer::Confirm;

use mergewatch_core::models::Decision;
use mergewatch_core::ProblemReport;

use crate::style;

/// Presents a problem report and returns the user's decision.
pub trait DecisionPrompt {
    fn decide(&mut self, report: &ProblemReport) -> Result<Decision>;
}

/// Prints the coloured report and asks on the terminal. Blocks until the
/// user answers.
#[derive(Debug, Default)]
pub struct InteractivePrompt;

impl DecisionPrompt for InteractivePrompt {
    fn decide(&mut self, report: &ProblemReport) -> Result<Decision> {
        println!();
        println!("{}", style::header("Remote changes detected"));
        println!();
        print!("{}", style::render_report(report));
        println!();

        let accepted = Confirm::new()
            .with_prompt("Commit local changes, merge the remote branch and push?")
            .default(report.is_clean())
            .interact()
            .context("failed to read merge decision")?;

        Ok(if accepted {
            Decision::Accept
        } else {
            Decision::Decline
        })
    }
}

/// Always answers the same way. Counts how often it was asked.
#[derive(Debug)]
pub struct FixedPolicy {
    decision: Decision,
    asked: usize,
}

impl FixedPolicy {
    pub fn new(decision: Decision) -> Self {
        Self { decision, asked: 0 }
    }

    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl DecisionPrompt for FixedPolicy {
    fn decide(&mut self, report: &ProblemReport) -> Result<Decision> {
        self.asked += 1;
        tracing::info!(
            decision = ?self.decision,
            conflicts = report.conflict_count(),
            duplicates = report.duplicate_count(),
            "applying fixed merge policy"
        );
        Ok(self.decision)
    }
}
