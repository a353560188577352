//! healthgate CLI entry point.

use clap::Parser;
use healthgate::check::EXIT_RUNTIME_ERROR;
use healthgate::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

/// Overrides the log filter, e.g. `HEALTHGATE_LOG=healthgate=trace`.
const LOG_ENV: &str = "HEALTHGATE_LOG";

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    // stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    };

    let exit_code = runtime.block_on(cli::run(cli));
    std::process::exit(exit_code);
}
