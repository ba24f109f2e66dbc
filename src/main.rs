// Entrypoint for the `store` CLI.
// - Parses arguments, sets up logging and resolves the configuration.
// - Builds one HTTP client, wrapped in the retry decorator, and hands it
//   to the command handler.
// - Per-file failures in `add` never abort the run; they only influence
//   the exit status once the whole batch is reported.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use filestore_cli::cli::{Cli, Commands};
use filestore_cli::commands::{self, ExitPolicy};
use filestore_cli::config::{Config, MAX_JOBS};
use filestore_cli::retry::Retrying;
use filestore_cli::ApiClient;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v` when it is set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(server) = &cli.server {
        config.base_url = server.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(attempts) = cli.attempts {
        config.max_attempts = attempts;
    }
    Ok(config.normalized())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli)?;
    tracing::debug!(server = %config.base_url, "using store");
    let api = ApiClient::new(&config)?;
    let store = Retrying::new(
        api,
        config.max_attempts,
        Duration::from_millis(config.backoff_ms),
    );

    let ok = match cli.command {
        Commands::Add { paths, jobs, strict } => {
            let jobs = jobs.unwrap_or(config.jobs).clamp(1, MAX_JOBS);
            let report = commands::add(&store, &paths, jobs);
            let policy = if strict {
                ExitPolicy::AnyFailed
            } else {
                ExitPolicy::AllFailed
            };
            !policy.is_failure(&report)
        }
        Commands::Update { path } => !commands::update(&store, &path).is_failed(),
        Commands::Remove { name, yes } => commands::remove(&store, &name, yes)?,
        Commands::List => {
            commands::list(&store)?;
            true
        }
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
