//! End-to-end tests for the harness engine
//!
//! These tests drive the built-in suites against simulated modules and
//! verify ordering, counting, guaranteed unload and the failure dump.

mod support;

use std::path::PathBuf;

use modcheck::commands::RunArgs;
use modcheck::common::config::{AssertionConfig, Config};
use modcheck::testing::registry;
use modcheck::testing::{
    AssertionEngine, Lifecycle, LifecycleState, ReportAggregator, RunOutcome, Summary, Transcript,
};
use modcheck::{CommandChannel, Error};
use support::{Kind, SimModule};

fn engine() -> AssertionEngine {
    AssertionEngine::new(
        AssertionConfig {
            poll_timeout_ms: 0,
            poll_interval_ms: 1,
            excerpt_chars: 500,
        },
        Transcript::silent(),
    )
}

async fn run_suite(name: &str, module: &mut SimModule) -> RunOutcome {
    let suite = registry::find_suite(name).expect("built-in suite");
    let mut lifecycle = Lifecycle::new(&suite, engine());
    lifecycle.run(module).await
}

fn completed(outcome: &RunOutcome) -> Summary {
    match outcome {
        RunOutcome::Completed(_) => ReportAggregator::summarize(outcome).unwrap(),
        RunOutcome::Aborted { error, .. } => panic!("Run aborted: {}", error),
    }
}

fn assert_invariants(outcome: &RunOutcome) {
    let session = outcome.session();
    assert_eq!(session.total(), session.passed() + session.failed());
    if let Some(summary) = ReportAggregator::summarize(outcome) {
        assert!((0.0..=100.0).contains(&summary.success_rate));
    }
}

#[tokio::test]
async fn test_list_suite_passes() {
    let mut module = SimModule::new("ex_list", Kind::List);
    let outcome = run_suite("list", &mut module).await;
    let summary = completed(&outcome);

    assert_invariants(&outcome);
    assert_eq!(summary.failed, 0, "{:?}", outcome.session().records());
    // 7 suite assertions plus the two lifecycle markers
    assert_eq!(summary.total, 9);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.success_rate, 100.0);

    let records = outcome.session().records();
    assert_eq!(records.first().unwrap().description, "Module loading");
    assert_eq!(records.last().unwrap().description, "Module unloading");
    assert!(records
        .iter()
        .any(|r| r.pattern == "List contents:.*10 20" && r.passed));
}

#[tokio::test]
async fn test_stack_underflow_counts_as_pass() {
    let mut module = SimModule::new("ex_stack", Kind::Stack);
    let outcome = run_suite("stack", &mut module).await;
    let summary = completed(&outcome);

    assert_eq!(summary.failed, 0, "{:?}", outcome.session().records());
    let records = outcome.session().records();
    let underflow = records
        .iter()
        .find(|r| r.pattern == "Stack underflow")
        .unwrap();
    assert!(underflow.passed);
    assert!(records
        .iter()
        .any(|r| r.pattern == r"Stack contents \(top to bottom\): 40 30 20 10" && r.passed));
}

#[tokio::test]
async fn test_bitmap_suite_passes() {
    let mut module = SimModule::new("ex_bitmap", Kind::Bitmap);
    let outcome = run_suite("bitmap", &mut module).await;
    let summary = completed(&outcome);

    assert_eq!(summary.failed, 0, "{:?}", outcome.session().records());
    assert!(module
        .calls
        .iter()
        .any(|c| c == "write index=5"));
}

#[tokio::test]
async fn test_search_uses_captured_value() {
    let mut module = SimModule::new("ex_bin_search", Kind::Search);
    let outcome = run_suite("search", &mut module).await;
    let summary = completed(&outcome);

    assert_eq!(summary.failed, 0, "{:?}", outcome.session().records());
    assert_eq!(summary.skipped, 0);

    let record = outcome
        .session()
        .records()
        .iter()
        .find(|r| r.description.starts_with("Search existing value "))
        .unwrap();
    let value: i64 = record
        .description
        .trim_start_matches("Search existing value ")
        .parse()
        .unwrap();
    assert!((0..100).contains(&value));
    assert_eq!(record.pattern, format!("Value {} found in array", value));
    assert!(module.calls.contains(&format!("write value={}", value)));
}

#[tokio::test]
async fn test_capture_miss_skips_dependent_step() {
    let mut module = SimModule::new("ex_bin_search", Kind::Search);
    module.hide_listing = true;
    let outcome = run_suite("search", &mut module).await;
    let summary = completed(&outcome);

    assert_invariants(&outcome);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert!(!module
        .calls
        .iter()
        .any(|c| c.starts_with("write value=") && c != "write value=100"));
}

#[tokio::test]
async fn test_failed_assertions_do_not_stop_suite() {
    // A list module cannot satisfy the stack suite
    let mut module = SimModule::new("ex_list", Kind::List);
    let outcome = run_suite("stack", &mut module).await;
    let summary = completed(&outcome);

    assert_invariants(&outcome);
    assert!(summary.failed > 0);
    assert_eq!(summary.exit_code(), 1);

    let suite = registry::find_suite("stack").unwrap();
    assert_eq!(summary.total, suite.assertion_count() + 2);

    let records = outcome.session().records();
    let last = records.last().unwrap();
    assert_eq!(last.description, "Module unloading");
    assert!(last.passed);
    assert_eq!(module.unloads, 1);

    let failed = records.iter().find(|r| !r.passed).unwrap();
    assert!(failed.excerpt.as_deref().unwrap().contains("ex_list:"));
}

#[tokio::test]
async fn test_execution_error_still_unloads_once() {
    let mut module = SimModule::new("ex_list", Kind::List);
    module.fail_cmd = Some("print".to_string());

    let suite = registry::find_suite("list").unwrap();
    let mut lifecycle = Lifecycle::new(&suite, engine());
    let outcome = lifecycle.run(&mut module).await;

    match &outcome {
        RunOutcome::Aborted { error, log, .. } => {
            assert!(matches!(error, Error::Execution { .. }));
            assert!(log.as_deref().unwrap().contains("Added item: 20"));
        }
        RunOutcome::Completed(_) => panic!("Expected aborted run"),
    }
    assert_eq!(module.unloads, 1);
    assert!(!module.calls.iter().any(|c| c == "write cmd=find"));
    assert_eq!(lifecycle.state(), LifecycleState::Unloaded);

    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dmesg_failure.log");
    let aggregator = ReportAggregator::new(dump.clone(), true);
    assert_eq!(lifecycle.report(&outcome, &aggregator), 1);
    assert_eq!(lifecycle.state(), LifecycleState::Reported);
    assert!(std::fs::read_to_string(&dump)
        .unwrap()
        .contains("ex_list module unloaded"));
}

#[tokio::test]
async fn test_unreadable_log_dumps_last_snapshot() {
    let mut module = SimModule::new("ex_list", Kind::List);
    // Loaded marker and the first assertion read the log, the next read fails
    module.fail_reads_from = Some(3);

    let suite = registry::find_suite("list").unwrap();
    let mut lifecycle = Lifecycle::new(&suite, engine());
    let outcome = lifecycle.run(&mut module).await;

    match &outcome {
        RunOutcome::Aborted { error, log, .. } => {
            assert!(matches!(error, Error::Execution { operation, .. } if operation == "read log"));
            let log = log.as_deref().unwrap();
            assert!(log.contains("Added item: 10"));
            assert!(!log.contains("Added item: 20"));
        }
        RunOutcome::Completed(_) => panic!("Expected aborted run"),
    }
    assert_eq!(module.unloads, 1);

    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dmesg_failure.log");
    let aggregator = ReportAggregator::new(dump.clone(), true);
    assert_eq!(lifecycle.report(&outcome, &aggregator), 1);
    assert!(std::fs::read_to_string(&dump)
        .unwrap()
        .contains("ex_list: Added item: 10"));
}

#[tokio::test]
async fn test_load_failure_skips_unload() {
    let mut module = SimModule::new("ex_list", Kind::List);
    module.fail_load = true;
    let outcome = run_suite("list", &mut module).await;

    assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    assert_eq!(module.unloads, 0);
    assert_eq!(outcome.session().total(), 0);
}

#[tokio::test]
async fn test_lifecycle_order() {
    let mut module = SimModule::new("ex_stack", Kind::Stack);
    let suite = registry::find_suite("stack").unwrap();
    let mut lifecycle = Lifecycle::new(&suite, engine());
    let outcome = lifecycle.run(&mut module).await;
    completed(&outcome);

    assert_eq!(
        lifecycle.history(),
        &[
            LifecycleState::Init,
            LifecycleState::Loaded,
            LifecycleState::SuiteRunning,
            LifecycleState::Unloaded,
        ]
    );

    // clear, load, then the marker read happens before any parameter write
    assert_eq!(&module.calls[..3], &["clear", "load", "read"]);
    let first_write = module.calls.iter().position(|c| c.starts_with("write")).unwrap();
    let second_clear = module.calls.iter().rposition(|c| c == "clear").unwrap();
    assert!(second_clear < first_write);
    let unload = module.calls.iter().position(|c| c == "unload").unwrap();
    assert_eq!(module.calls.last().unwrap(), "read");
    assert!(unload > first_write);
}

#[tokio::test]
async fn test_clear_then_read_is_empty() {
    let mut module = SimModule::new("ex_list", Kind::List);
    module.load().await.unwrap();
    module.write_parameter("value", "10").await.unwrap();
    assert!(!module.read_log().await.unwrap().is_empty());

    module.clear_log().await.unwrap();
    assert_eq!(module.read_log().await.unwrap(), "");
}

fn run_args(module: &str, failure_log: PathBuf) -> RunArgs {
    RunArgs {
        suite: Some("list".to_string()),
        module: Some(module.to_string()),
        json: true,
        failure_log: Some(failure_log),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_missing_artifact_never_loads() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.preflight.artifact_dirs = vec![dir.path().display().to_string()];

    let mut module = SimModule::new("ex_list", Kind::List);
    let args = run_args("ex_list", dir.path().join("dmesg_failure.log"));
    let result = modcheck::cli::run_with_channel(&args, &config, &mut module).await;

    assert!(matches!(result, Err(Error::ArtifactMissing { .. })));
    assert_eq!(module.loads, 0);
    assert!(module.calls.is_empty());
}

#[tokio::test]
async fn test_run_with_artifact_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ex_list.ko"), b"").unwrap();
    let mut config = Config::default();
    config.preflight.artifact_dirs = vec![dir.path().display().to_string()];
    config.assertions.poll_timeout_ms = 0;

    let mut module = SimModule::new("ex_list", Kind::List);
    let args = run_args("ex_list", dir.path().join("dmesg_failure.log"));
    let code = modcheck::cli::run_with_channel(&args, &config, &mut module)
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(module.loads, 1);
    assert_eq!(module.unloads, 1);
    assert!(!dir.path().join("dmesg_failure.log").exists());
}

#[tokio::test]
async fn test_run_with_failures_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.preflight.enabled = false;
    config.assertions.poll_timeout_ms = 0;

    let mut module = SimModule::new("ex_queue", Kind::Stack);
    let mut args = run_args("ex_queue", dir.path().join("dmesg_failure.log"));
    args.suite = Some("queue".to_string());
    let code = modcheck::cli::run_with_channel(&args, &config, &mut module)
        .await
        .unwrap();

    assert_eq!(code, 1);
    assert_eq!(module.unloads, 1);
}
