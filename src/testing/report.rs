//! Report aggregator: summary, exit status, failure dump

use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;

use super::runner::RunOutcome;
use super::session::{AssertionRecord, SkippedStep, TestSession};
use crate::common::Result;

/// Totals of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub suite: String,
    pub module: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage of passed assertions, 0 when nothing ran
    pub success_rate: f64,
}

impl Summary {
    pub fn from_session(session: &TestSession) -> Self {
        let total = session.total();
        let passed = session.passed();
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        Self {
            suite: session.suite().to_string(),
            module: session.module().to_string(),
            total,
            passed,
            failed: session.failed(),
            skipped: session.skipped().len(),
            success_rate,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for this summary
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}

/// JSON document printed with `--json`
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonReport<'a> {
    Completed {
        summary: Summary,
        assertions: &'a [AssertionRecord],
        skipped: &'a [SkippedStep],
    },
    Aborted {
        error: String,
        failure_log: Option<PathBuf>,
        assertions: &'a [AssertionRecord],
    },
}

/// Renders results and decides the exit status
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    failure_log: PathBuf,
    json: bool,
}

impl ReportAggregator {
    pub fn new(failure_log: PathBuf, json: bool) -> Self {
        Self { failure_log, json }
    }

    /// Summary of a run, or `None` when it was aborted
    pub fn summarize(outcome: &RunOutcome) -> Option<Summary> {
        match outcome {
            RunOutcome::Completed(session) => Some(Summary::from_session(session)),
            RunOutcome::Aborted { .. } => None,
        }
    }

    /// Print the outcome and return the process exit status
    pub fn report(&self, outcome: &RunOutcome) -> i32 {
        match outcome {
            RunOutcome::Completed(session) => {
                let summary = Summary::from_session(session);
                if self.json {
                    self.print_json(&JsonReport::Completed {
                        summary: summary.clone(),
                        assertions: session.records(),
                        skipped: session.skipped(),
                    });
                } else {
                    print_summary(&summary);
                }
                summary.exit_code()
            }
            RunOutcome::Aborted {
                session,
                error,
                log,
            } => {
                let saved = match log {
                    Some(log) => match write_failure_dump(&self.failure_log, log) {
                        Ok(()) => Some(self.failure_log.clone()),
                        Err(e) => {
                            error!(path = %self.failure_log.display(), error = %e, "Could not write failure log");
                            None
                        }
                    },
                    None => None,
                };

                if self.json {
                    self.print_json(&JsonReport::Aborted {
                        error: error.to_string(),
                        failure_log: saved,
                        assertions: session.records(),
                    });
                } else {
                    println!("\n{} {}", "[!] Test error:".red().bold(), error);
                    if let Some(path) = saved {
                        println!("Debug info saved to {}", path.display());
                    }
                }
                1
            }
        }
    }

    fn print_json(&self, report: &JsonReport<'_>) {
        match render_json(report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "Could not serialize report"),
        }
    }
}

fn render_json(report: &JsonReport<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the log captured at the time of failure for post-mortem inspection
pub fn write_failure_dump(path: &Path, log: &str) -> Result<()> {
    std::fs::write(path, log)?;
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("\n{}", "=== Test Summary ===".cyan());
    println!("Total tests:  {}", summary.total);
    println!("Passed:       {}", summary.passed.to_string().green());
    println!(
        "Failed:       {}",
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
    if summary.skipped > 0 {
        println!("Skipped:      {}", summary.skipped.to_string().yellow());
    }
    println!("Success rate: {:.1}%", summary.success_rate);

    if summary.all_passed() {
        println!("\n{}", "FINAL RESULT: ALL TESTS PASSED".green().bold());
    } else {
        println!("\n{}", "FINAL RESULT: SOME TESTS FAILED".red().bold());
    }
}
