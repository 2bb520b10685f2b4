//! Harness engine
//!
//! Drives a module through its command channel, following a declarative
//! suite definition, and judges it only by what appears in its log.

pub mod assertion;
pub mod capture;
mod config;
pub mod executor;
pub mod registry;
pub mod report;
pub mod runner;
pub mod session;
pub mod transcript;

pub use assertion::AssertionEngine;
pub use config::*;
pub use executor::SuiteExecutor;
pub use report::{ReportAggregator, Summary};
pub use runner::{Lifecycle, LifecycleState, RunOutcome};
pub use session::TestSession;
pub use transcript::Transcript;
