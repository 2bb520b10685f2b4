//! Suite executor
//!
//! Runs the steps of a suite in order. Assertion failures never stop the
//! suite; only a failed external operation does.

use tracing::{debug, warn};

use super::assertion::AssertionEngine;
use super::capture::Captures;
use super::config::{compile, ParamWrite, Step, SuiteDefinition};
use super::session::TestSession;
use crate::channel::CommandChannel;
use crate::common::{Error, Result};

/// Executes suite steps against a channel
pub struct SuiteExecutor<'a> {
    engine: &'a AssertionEngine,
    captures: Captures,
}

impl<'a> SuiteExecutor<'a> {
    pub fn new(engine: &'a AssertionEngine) -> Self {
        Self {
            engine,
            captures: Captures::new(),
        }
    }

    /// Run every step of `suite` in order
    pub async fn run(
        &mut self,
        suite: &SuiteDefinition,
        channel: &mut dyn CommandChannel,
        session: &mut TestSession,
    ) -> Result<()> {
        for (i, step) in suite.steps.iter().enumerate() {
            let step_num = i + 1;
            if let Some(title) = &step.section {
                self.engine.transcript().section(title);
            }

            let missing: Vec<String> = step
                .required_captures()
                .into_iter()
                .filter(|name| self.captures.get(name).is_none())
                .collect();
            if !missing.is_empty() {
                let reason = format!(
                    "step {} skipped: no value captured for {}",
                    step_num,
                    missing.join(", ")
                );
                warn!(suite = %suite.name, step = step_num, "{}", reason);
                self.engine.transcript().warning(&reason);
                session.record_skip(step_num, &reason);
                continue;
            }

            self.run_step(step, step_num, channel, session).await?;
        }
        Ok(())
    }

    async fn run_step(
        &mut self,
        step: &Step,
        step_num: usize,
        channel: &mut dyn CommandChannel,
        session: &mut TestSession,
    ) -> Result<()> {
        for write in &step.write {
            let value = self.resolve(&write.value, false)?;
            let resolved = ParamWrite::new(&write.key, &value);
            debug!(step = step_num, write = %resolved, "Writing parameter");
            self.engine.transcript().write(&resolved);
            channel.write_parameter(&resolved.key, &resolved.value).await?;
        }

        if let Some(capture) = &step.capture {
            let re = compile(&capture.pattern)
                .map_err(|e| Error::InvalidSuite(format!("capture '{}': {}", capture.name, e)))?;
            let polled = self.engine.poll_log(channel, &re).await?;
            match self.captures.scan(capture, &re, &polled.snapshot) {
                Some(v) => {
                    debug!(name = %capture.name, count = v.all.len(), chosen = v.chosen, "Captured values");
                    self.engine.transcript().captured(&capture.name, &v.all, v.chosen);
                }
                None => {
                    let reason = format!("No values captured for '{}'", capture.name);
                    warn!(step = step_num, "{}", reason);
                    self.engine.transcript().warning(&reason);
                }
            }
        }

        for assertion in &step.expect {
            let resolved = self
                .captures
                .resolve(&assertion.pattern, true)
                .zip(self.captures.resolve(&assertion.description, false));
            match resolved {
                Some((pattern, description)) => {
                    self.engine
                        .assert_log_matches(channel, session, &pattern, &description)
                        .await?;
                }
                None => {
                    // The step's own capture came back empty
                    let reason = format!(
                        "step {} assertion '{}' skipped: no captured value",
                        step_num, assertion.description
                    );
                    self.engine.transcript().warning(&reason);
                    session.record_skip(step_num, &reason);
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, text: &str, escape: bool) -> Result<String> {
        self.captures.resolve(text, escape).ok_or_else(|| {
            Error::Internal(format!("unresolved placeholder in '{}'", text))
        })
    }
}
