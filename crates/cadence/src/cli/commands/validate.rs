//! Validate command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use cadence_core::config::{find_config, load_config, load_tasks_cfg, Config};
use cadence_tasks::{TaskDag, TrackerSettings};

use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Validate a task configuration file
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Task configuration file (defaults to the path in cadence.toml)
    pub path: Option<PathBuf>,
}

/// Outcome of validating the service and task configuration
#[derive(Debug, Default, Serialize)]
struct ValidationReport {
    valid: bool,
    config_path: Option<PathBuf>,
    tasks_cfg_path: Option<PathBuf>,
    tasks: usize,
    jobs: usize,
    waves: usize,
    settings: EffectiveSettings,
    errors: Vec<String>,
}

/// Runtime settings the loaded configuration resolves to
#[derive(Debug, Default, Serialize)]
struct EffectiveSettings {
    max_users: usize,
    subscriber_timeout_secs: u64,
    sweep_interval_secs: u64,
    task_cfg_max_age_secs: u64,
}

impl From<&Config> for EffectiveSettings {
    fn from(config: &Config) -> Self {
        let tracker = TrackerSettings::from(&config.tracker);
        Self {
            max_users: tracker.max_users,
            subscriber_timeout_secs: tracker.subscriber_timeout.as_secs(),
            sweep_interval_secs: tracker.sweep_interval.as_secs(),
            task_cfg_max_age_secs: config.task_cfg.max_age().as_secs(),
        }
    }
}

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(path = ?self.path, "executing validate command");
        let cwd = std::env::current_dir()?;
        let report = self.check(&cwd);

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    print_report(&report);
                }
            }
        }

        if !report.valid {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }

        Ok(())
    }

    fn check(&self, cwd: &Path) -> ValidationReport {
        let mut report = ValidationReport::default();

        let config = match find_config(cwd) {
            Some(path) => {
                let loaded = load_config(&path);
                report.config_path = Some(path);
                match loaded {
                    Ok(config) => config,
                    Err(e) => {
                        report.errors.push(format!("Configuration: {}", e));
                        Config::default()
                    }
                }
            }
            None => Config::default(),
        };

        report.settings = EffectiveSettings::from(&config);

        let tasks_cfg_path = match &self.path {
            Some(path) => cwd.join(path),
            None => cwd.join(&config.task_cfg.path),
        };

        match load_tasks_cfg(&tasks_cfg_path) {
            Ok(cfg) => {
                report.tasks = cfg.tasks.len();
                report.jobs = cfg.jobs.len();
                match TaskDag::build(&cfg) {
                    Ok(dag) => report.waves = dag.waves().len(),
                    Err(e) => report.errors.push(format!("Task graph: {}", e)),
                }
            }
            Err(e) => report.errors.push(format!("Task configuration: {}", e)),
        }

        report.tasks_cfg_path = Some(tasks_cfg_path);
        report.valid = report.errors.is_empty();
        report
    }
}

fn print_report(report: &ValidationReport) {
    println!("{}", style("Validation Results").bold());
    println!();

    if let Some(path) = &report.config_path {
        println!("Config: {}", style(path.display()).cyan());
    }
    if let Some(path) = &report.tasks_cfg_path {
        println!("Tasks:  {}", style(path.display()).cyan());
    }
    println!(
        "Tracker: up to {} subscribers, {}s idle timeout, {}s sweep",
        report.settings.max_users,
        report.settings.subscriber_timeout_secs,
        report.settings.sweep_interval_secs
    );
    println!();

    if report.valid {
        println!(
            "{} {} task specs, {} jobs, {} waves",
            style("✓ Task configuration is valid:").green().bold(),
            report.tasks,
            report.jobs,
            report.waves
        );
        return;
    }

    println!("{}", style("Errors:").red().bold());
    for error in &report.errors {
        println!("  {} {}", style("✗").red(), error);
    }
    println!();
    println!(
        "{} with {} error(s)",
        style("✗ Validation failed").red().bold(),
        report.errors.len()
    );
}
