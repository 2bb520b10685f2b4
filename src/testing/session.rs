//! Per-run counters and assertion records

use serde::Serialize;

/// Outcome of one assertion
#[derive(Debug, Clone, Serialize)]
pub struct AssertionRecord {
    /// 1-based position in the run
    pub index: usize,
    pub description: String,
    pub pattern: String,
    pub passed: bool,
    /// Tail of the log when the pattern was not found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// A step that did not run because a captured value was missing
#[derive(Debug, Clone, Serialize)]
pub struct SkippedStep {
    pub step: usize,
    pub reason: String,
}

/// Mutable state of one run
///
/// `total == passed + failed` holds after every mutation: the counters are
/// only advanced together with a record.
#[derive(Debug, Clone)]
pub struct TestSession {
    module: String,
    suite: String,
    records: Vec<AssertionRecord>,
    passed: usize,
    failed: usize,
    skipped: Vec<SkippedStep>,
}

impl TestSession {
    pub fn new(module: &str, suite: &str) -> Self {
        Self {
            module: module.to_string(),
            suite: suite.to_string(),
            records: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: Vec::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn records(&self) -> &[AssertionRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[SkippedStep] {
        &self.skipped
    }

    /// Index the next assertion will get
    pub fn next_index(&self) -> usize {
        self.records.len() + 1
    }

    pub(crate) fn record_pass(&mut self, description: &str, pattern: &str) -> &AssertionRecord {
        self.passed += 1;
        self.push(description, pattern, true, None)
    }

    pub(crate) fn record_fail(
        &mut self,
        description: &str,
        pattern: &str,
        excerpt: String,
    ) -> &AssertionRecord {
        self.failed += 1;
        self.push(description, pattern, false, Some(excerpt))
    }

    pub(crate) fn record_skip(&mut self, step: usize, reason: &str) {
        self.skipped.push(SkippedStep {
            step,
            reason: reason.to_string(),
        });
    }

    fn push(
        &mut self,
        description: &str,
        pattern: &str,
        passed: bool,
        excerpt: Option<String>,
    ) -> &AssertionRecord {
        let index = self.next_index();
        self.records.push(AssertionRecord {
            index,
            description: description.to_string(),
            pattern: pattern.to_string(),
            passed,
            excerpt,
        });
        debug_assert_eq!(self.total(), self.passed + self.failed);
        &self.records[index - 1]
    }
}
