//! Assertion engine: match a pattern against the module's log
//!
//! The log becomes consistent only after a short flush delay, so a check
//! polls: read, test, back off, retry until the configured timeout.

use regex::Regex;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::config::compile;
use super::session::TestSession;
use super::transcript::Transcript;
use crate::channel::CommandChannel;
use crate::common::config::AssertionConfig;
use crate::common::{tail_chars, Error, Result};

/// Result of polling the log for a pattern
#[derive(Debug)]
pub struct LogMatch {
    pub found: bool,
    /// Last snapshot read
    pub snapshot: String,
}

/// Deadline used when the configured timeout does not fit in an `Instant`
const FAR_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Evaluates log assertions and records them in the session
pub struct AssertionEngine {
    config: AssertionConfig,
    transcript: Transcript,
    last_snapshot: Mutex<Option<String>>,
}

impl AssertionEngine {
    pub fn new(config: AssertionConfig, transcript: Transcript) -> Self {
        Self {
            config,
            transcript,
            last_snapshot: Mutex::new(None),
        }
    }

    /// Most recent log content this engine read successfully
    pub fn last_snapshot(&self) -> Option<String> {
        self.last_snapshot.lock().ok().and_then(|s| s.clone())
    }

    fn remember(&self, snapshot: &str) {
        if let Ok(mut last) = self.last_snapshot.lock() {
            *last = Some(snapshot.to_string());
        }
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript
    }

    /// Poll the log until `re` matches or the timeout passes
    ///
    /// Always reads at least once. A failed read is fatal and propagates.
    pub async fn poll_log(
        &self,
        channel: &mut dyn CommandChannel,
        re: &Regex,
    ) -> Result<LogMatch> {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.poll_timeout())
            .unwrap_or(now + FAR_DEADLINE);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let snapshot = channel.read_log().await?;
            self.remember(&snapshot);
            if re.is_match(&snapshot) {
                debug!(pattern = re.as_str(), attempts, "Pattern found");
                return Ok(LogMatch {
                    found: true,
                    snapshot,
                });
            }
            if Instant::now() >= deadline {
                debug!(pattern = re.as_str(), attempts, "Pattern not found");
                return Ok(LogMatch {
                    found: false,
                    snapshot,
                });
            }
            sleep(self.config.poll_interval()).await;
        }
    }

    /// Check that `pattern` occurs in the log and record the outcome
    ///
    /// A missing pattern is a recorded failure, not an error: the returned
    /// boolean lets callers branch, and the suite keeps going either way.
    pub async fn assert_log_matches(
        &self,
        channel: &mut dyn CommandChannel,
        session: &mut TestSession,
        pattern: &str,
        description: &str,
    ) -> Result<bool> {
        let re = compile(pattern)
            .map_err(|e| Error::InvalidSuite(format!("pattern '{}': {}", pattern, e)))?;
        let outcome = self.poll_log(channel, &re).await?;

        let record = if outcome.found {
            session.record_pass(description, pattern)
        } else {
            let excerpt = tail_chars(&outcome.snapshot, self.config.excerpt_chars).to_string();
            session.record_fail(description, pattern, excerpt)
        };
        self.transcript.assertion(record);
        Ok(outcome.found)
    }
}
