//! modcheck - conformance harness for kernel data-structure modules
//!
//! Loads a module, drives it through its sysfs parameters, and checks
//! the kernel log for the expected lines.

use clap::Parser;
use modcheck::cli;
use modcheck::commands::Cli;
use modcheck::common::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    logging::init_cli(cli.run.verbose);

    match cli::dispatch(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
