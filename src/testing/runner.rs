//! Lifecycle controller
//!
//! Loads the module, checks its load marker, runs the suite, and unloads
//! the module on every path out of the suite before reporting.

use tracing::{info, warn};

use super::assertion::AssertionEngine;
use super::config::SuiteDefinition;
use super::executor::SuiteExecutor;
use super::report::ReportAggregator;
use super::session::TestSession;
use crate::channel::CommandChannel;
use crate::common::{Error, Result};

/// Phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Init,
    Loaded,
    SuiteRunning,
    Unloaded,
    Reported,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The suite ran to the end; assertion failures are in the session
    Completed(TestSession),
    /// An external operation failed
    Aborted {
        session: TestSession,
        error: Error,
        /// Log content read after the failure, or the last snapshot read
        /// before it when the log itself became unreadable
        log: Option<String>,
    },
}

impl RunOutcome {
    pub fn session(&self) -> &TestSession {
        match self {
            RunOutcome::Completed(session) => session,
            RunOutcome::Aborted { session, .. } => session,
        }
    }
}

/// Drives one suite through the module lifecycle
pub struct Lifecycle<'a> {
    suite: &'a SuiteDefinition,
    engine: AssertionEngine,
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl<'a> Lifecycle<'a> {
    pub fn new(suite: &'a SuiteDefinition, engine: AssertionEngine) -> Self {
        Self {
            suite,
            engine,
            state: LifecycleState::Init,
            history: vec![LifecycleState::Init],
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    fn enter(&mut self, state: LifecycleState) {
        info!(suite = %self.suite.name, from = ?self.state, to = ?state, "Lifecycle transition");
        self.state = state;
        self.history.push(state);
    }

    /// Run the suite against the module behind `channel`
    pub async fn run(&mut self, channel: &mut dyn CommandChannel) -> RunOutcome {
        let module = channel.module().to_string();
        let mut session = TestSession::new(&module, &self.suite.name);
        let transcript = self.engine.transcript();
        transcript.header(&self.suite.name, &module, self.suite.description.as_deref());
        transcript.phase("Module Lifecycle");

        // Nothing is loaded yet, so a failure here needs no cleanup
        if let Err(error) = self.load(channel).await {
            return abort(channel, session, error, self.engine.last_snapshot()).await;
        }

        let suite_result = self.run_loaded(channel, &mut session).await;

        let unload_result = channel.unload().await;
        self.enter(LifecycleState::Unloaded);

        let error = match (suite_result, unload_result) {
            (Ok(()), Ok(())) => None,
            (Ok(()), Err(e)) => Some(e),
            (Err(e), Ok(())) => Some(e),
            (Err(e), Err(unload_error)) => {
                warn!(error = %unload_error, "Unload failed after aborted suite");
                Some(e)
            }
        };
        if let Some(error) = error {
            return abort(channel, session, error, self.engine.last_snapshot()).await;
        }

        transcript.phase("Module Unload");
        let unloaded = self.suite.markers.unloaded_for(&module);
        if let Err(error) = self
            .engine
            .assert_log_matches(channel, &mut session, &unloaded, "Module unloading")
            .await
        {
            return abort(channel, session, error, self.engine.last_snapshot()).await;
        }

        RunOutcome::Completed(session)
    }

    async fn load(&mut self, channel: &mut dyn CommandChannel) -> Result<()> {
        channel.clear_log().await?;
        channel.load().await?;
        self.enter(LifecycleState::Loaded);
        Ok(())
    }

    async fn run_loaded(
        &mut self,
        channel: &mut dyn CommandChannel,
        session: &mut TestSession,
    ) -> Result<()> {
        let loaded = self.suite.markers.loaded_for(channel.module());
        self.engine
            .assert_log_matches(channel, session, &loaded, "Module loading")
            .await?;

        self.engine
            .transcript()
            .phase(&format!("{} Operation Tests", title_case(&self.suite.name)));
        channel.clear_log().await?;
        self.enter(LifecycleState::SuiteRunning);

        let mut executor = SuiteExecutor::new(&self.engine);
        executor.run(self.suite, channel, session).await
    }

    /// Hand the finished run to the report aggregator
    pub fn report(&mut self, outcome: &RunOutcome, aggregator: &ReportAggregator) -> i32 {
        let code = aggregator.report(outcome);
        self.enter(LifecycleState::Reported);
        code
    }
}

async fn abort(
    channel: &mut dyn CommandChannel,
    session: TestSession,
    error: Error,
    last_snapshot: Option<String>,
) -> RunOutcome {
    warn!(error = %error, "Run aborted");
    let log = match channel.read_log().await {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(error = %e, "Could not read log after failure, using last snapshot");
            last_snapshot
        }
    };
    RunOutcome::Aborted {
        session,
        error,
        log,
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.replace('_', " ").chars().collect::<Vec<_>>();
    if let Some(first) = chars.first_mut() {
        *first = first.to_ascii_uppercase();
    }
    chars.into_iter().collect()
}
