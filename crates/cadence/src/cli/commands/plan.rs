//! Plan command

use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::{info, warn};

use cadence_core::config::{load_config_or_default, Config};
use cadence_core::error::CacheError;
use cadence_core::types::RepoState;
use cadence_git::GitRepoAccess;
use cadence_tasks::{TaskCfgCache, TaskDag};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Show the execution plan for a repo state
#[derive(Debug, Args)]
pub struct PlanCommand {
    /// Repository URL, as registered under [repos] in cadence.toml
    #[arg(long)]
    pub repo: String,

    /// Commit to read the task configuration from
    #[arg(long)]
    pub revision: String,

    /// Restrict the plan to one job and its dependencies
    #[arg(long)]
    pub job: Option<String>,
}

impl PlanCommand {
    /// Execute the plan command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(repo = %self.repo, revision = %self.revision, job = ?self.job, "executing plan command");
        let cwd = std::env::current_dir()?;
        let (config, _) = load_config_or_default(&cwd);

        let repo_state = RepoState::new(self.repo.clone(), self.revision.clone());
        let (dag, retained) = match self.build_dag(&config, &repo_state).await {
            Ok(planned) => planned,
            Err(e) => {
                output::error(&format!("{:#}", e));
                let code = match e.downcast_ref::<CacheError>() {
                    Some(CacheError::Repo { .. }) => exit_codes::ERROR,
                    _ => exit_codes::CONFIG_ERROR,
                };
                std::process::exit(code);
            }
        };

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "repo_state": repo_state.to_string(),
                    "job": self.job,
                    "retained": retained,
                    "waves": dag.waves(),
                    "tasks": dag.nodes(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", output::header("Execution Plan"));
                    println!("{}", output::key_value("Repo state", &repo_state.to_string()));
                    if let Some(job) = &self.job {
                        println!("{}", output::key_value("Job", job));
                    }
                    println!(
                        "{}",
                        output::key_value("Tasks", &style(dag.len()).cyan().to_string())
                    );
                    if !retained {
                        output::warning(&format!(
                            "Revision is older than the {}-day task configuration retention window",
                            config.task_cfg.max_age_days
                        ));
                    }
                    println!();
                    print!("{}", dag.execution_plan());
                }
            }
        }

        Ok(())
    }

    /// Build the plan and report whether the revision falls inside the
    /// configured retention window
    async fn build_dag(
        &self,
        config: &Config,
        repo_state: &RepoState,
    ) -> anyhow::Result<(TaskDag, bool)> {
        if !repo_state.is_valid() {
            anyhow::bail!("Both --repo and --revision must be non-empty");
        }

        let cache = TaskCfgCache::from_config(
            Arc::new(GitRepoAccess::from_config(config)),
            &config.task_cfg,
        );
        let cfg = cache.read_tasks_cfg(repo_state).await?;

        let dag = match &self.job {
            Some(job) => TaskDag::for_job(&cfg, job)?,
            None => TaskDag::build(&cfg)?,
        };

        let retained = cache.cleanup_expired() == 0;
        if !retained {
            warn!(repo_state = %repo_state, max_age_days = config.task_cfg.max_age_days, "revision outside retention window");
        }
        Ok((dag, retained))
    }
}
