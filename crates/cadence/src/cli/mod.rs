//! CLI definition and command handling

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{InitCommand, PlanCommand, ValidateCommand};

/// Cadence - task configuration validation and execution planning
#[derive(Debug, Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a default cadence.toml
    Init(InitCommand),

    /// Validate a task configuration file
    Validate(ValidateCommand),

    /// Show the execution plan for a repo state
    Plan(PlanCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Validate(ref cmd) => cmd.execute(&self),
            Commands::Plan(ref cmd) => cmd.execute(&self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "cadence",
            "--format",
            "json",
            "plan",
            "--repo",
            "https://example.com/repo.git",
            "--revision",
            "abc123",
            "--job",
            "Test-All",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Plan(cmd) => {
                assert_eq!(cmd.repo, "https://example.com/repo.git");
                assert_eq!(cmd.revision, "abc123");
                assert_eq!(cmd.job.as_deref(), Some("Test-All"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_validate_default_path() {
        let cli = Cli::try_parse_from(["cadence", "validate"]).unwrap();
        match cli.command {
            Commands::Validate(cmd) => assert!(cmd.path.is_none()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_plan_requires_revision() {
        assert!(Cli::try_parse_from(["cadence", "plan", "--repo", "r"]).is_err());
    }
}
