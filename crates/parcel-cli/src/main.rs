//! Parcel audit CLI.
//!
//! Main entry point for the `parcel-audit` binary.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use parcel_cli::cli::Cli;
use parcel_cli::CliError;
use parcel_common_config::Environment;
use parcel_common_log::{LogConfig, LogLevel};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {e}", e.code());
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {hint}");
            }
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    // .env files first so they feed both logging and configuration
    let _env = Environment::init()?;
    parcel_common_log::init(log_config(&cli))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;

    runtime.block_on(async move {
        let config = cli.load_config()?;
        cli.execute(config).await
    })
}

fn log_config(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::from_env();
    config.level = match cli.verbose {
        0 if cli.quiet => LogLevel::Error,
        0 if level_unset() => LogLevel::Warn,
        0 => config.level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    config
}

fn level_unset() -> bool {
    std::env::var_os("PARCEL_LOG_LEVEL").is_none() && std::env::var_os("RUST_LOG").is_none()
}
