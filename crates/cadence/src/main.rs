//! Cadence - task scheduler tooling

mod cli;
mod exit_codes;

use std::path::PathBuf;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::Cli;

/// Crates whose events go to the log file at debug level
const CADENCE_TARGETS: &[&str] = &["cadence", "cadence_core", "cadence_git", "cadence_tasks"];

/// Overrides `RUST_LOG` for the console when set
const LOG_ENV: &str = "CADENCE_LOG";

fn main() -> anyhow::Result<()> {
    let _guard = init_tracing();

    let cli = Cli::parse();
    cli.execute()
}

/// Console logging follows `CADENCE_LOG`, then `RUST_LOG`, then `warn`.
/// Cadence's own crates are also logged as JSON to a daily file under
/// ~/.cadence/logs, without dependency noise.
fn init_tracing() -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file, guard) = match log_directory() {
        Some(log_dir) => {
            let appender = tracing_appender::rolling::daily(log_dir, "cadence.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_filter(file_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

fn file_filter() -> EnvFilter {
    let directives: Vec<String> = CADENCE_TARGETS
        .iter()
        .map(|target| format!("{}=debug", target))
        .collect();
    EnvFilter::new(format!("warn,{}", directives.join(",")))
}

/// Returns the log directory path, creating it if needed.
fn log_directory() -> Option<PathBuf> {
    let log_dir = dirs::home_dir()?.join(".cadence").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_filter_covers_every_crate() {
        let filter = file_filter().to_string();
        assert!(filter.contains("warn"));
        for target in CADENCE_TARGETS {
            assert!(filter.contains(&format!("{}=debug", target)), "{}", filter);
        }
    }
}
