//! CLI command handling
//!
//! Resolves configuration and the suite, runs the pre-flight check, then
//! hands the module to the lifecycle controller.

pub mod preflight;

use colored::Colorize;
use tracing::info;

use crate::channel::{CommandChannel, SysfsChannel};
use crate::commands::{Cli, Commands, RunArgs};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::testing::registry;
use crate::testing::{AssertionEngine, Lifecycle, ReportAggregator, SuiteDefinition, Transcript};

/// Dispatch a parsed command line, returning the process exit status
pub async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Suites) => {
            list_suites()?;
            Ok(0)
        }
        Some(Commands::Show { suite }) => {
            let suite = registry::find_suite(&suite)?;
            print!("{}", serde_yaml::to_string(&suite)?);
            Ok(0)
        }
        None => {
            let args = cli.run;
            let config = load_config(&args)?;
            let module = module_name(&args)?;

            let mut channel = SysfsChannel::new(&module, config.channel.clone());
            channel.check_shell()?;
            run_with_channel(&args, &config, &mut channel).await
        }
    }
}

/// Select the suite, check the artifact, and run it through `channel`
pub async fn run_with_channel<C: CommandChannel>(
    args: &RunArgs,
    config: &Config,
    channel: &mut C,
) -> Result<i32> {
    let suite = select_suite(args)?;

    if config.preflight.enabled && !args.no_preflight {
        preflight::check_artifact(channel.module(), &config.preflight)?;
    }

    info!(suite = %suite.name, module = channel.module(), "Starting run");
    let transcript = Transcript::new(!args.json, args.verbose);
    let engine = AssertionEngine::new(config.assertions.clone(), transcript);
    let mut lifecycle = Lifecycle::new(&suite, engine);
    let outcome = lifecycle.run(channel).await;

    let failure_log = args
        .failure_log
        .clone()
        .unwrap_or_else(|| config.report.failure_log.clone());
    let aggregator = ReportAggregator::new(failure_log, args.json);
    Ok(lifecycle.report(&outcome, &aggregator))
}

fn load_config(args: &RunArgs) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn module_name(args: &RunArgs) -> Result<String> {
    args.module
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| Error::Config("Usage: modcheck <suite> <module>".to_string()))
}

fn select_suite(args: &RunArgs) -> Result<SuiteDefinition> {
    if let Some(path) = &args.suite_file {
        return registry::load_suite_file(path);
    }
    match args.suite.as_deref() {
        Some(name) if name != "-" => registry::find_suite(name),
        _ => Err(Error::Config(
            "No suite given. Pass a suite name or --suite-file".to_string(),
        )),
    }
}

fn list_suites() -> Result<()> {
    println!("{}", "Available suites:".blue().bold());
    for suite in registry::builtin_suites()? {
        let aliases = if suite.aliases.is_empty() {
            String::new()
        } else {
            format!(" (alias: {})", suite.aliases.join(", "))
        };
        println!(
            "  {}{} {}",
            suite.name.white().bold(),
            aliases.dimmed(),
            format!("[{} steps]", suite.steps.len()).dimmed()
        );
        if let Some(desc) = &suite.description {
            println!("      {}", desc);
        }
    }
    Ok(())
}
