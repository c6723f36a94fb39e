//! Task configuration checked into a repository (`tasks.json`)

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

use super::graph::validate_task_graph;

/// Default location of the task configuration inside a repository
pub const DEFAULT_TASKS_CFG_PATH: &str = "infra/bots/tasks.json";

fn default_priority() -> f64 {
    0.5
}

fn default_max_attempts() -> u32 {
    2
}

/// A named unit of work declared in a task configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Names of task specs that must succeed before this one runs
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Isolate target to execute
    #[serde(default)]
    pub isolate: Option<String>,

    /// Command line, when not using an isolate
    #[serde(default)]
    pub command: Vec<String>,

    /// Bot dimensions in "key:value" form
    #[serde(default)]
    pub dimensions: Vec<String>,

    /// Scheduling priority in [0, 1]
    #[serde(default = "default_priority")]
    pub priority: f64,

    /// Maximum number of attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds a pending task may wait for a bot
    #[serde(default)]
    pub expiration_secs: Option<u64>,

    /// Environment variables for the command
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl Default for TaskSpec {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
            isolate: None,
            command: Vec::new(),
            dimensions: Vec::new(),
            priority: default_priority(),
            max_attempts: default_max_attempts(),
            expiration_secs: None,
            environment: BTreeMap::new(),
        }
    }
}

impl TaskSpec {
    /// Add a dependency
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Set the isolate target
    pub fn with_isolate(mut self, isolate: impl Into<String>) -> Self {
        self.isolate = Some(isolate.into());
        self
    }

    /// Add a bot dimension
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimensions.push(dimension.into());
        self
    }
}

/// A named collection of task specs that is triggered together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Task specs this job runs (dependencies are pulled in automatically)
    pub task_specs: Vec<String>,

    /// Scheduling priority in [0, 1]
    #[serde(default = "default_priority")]
    pub priority: f64,

    /// When the job is triggered ("" means on every commit)
    #[serde(default)]
    pub trigger: String,
}

/// Parsed task configuration for one repo state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksCfg {
    /// Task specs by name
    #[serde(default)]
    pub tasks: HashMap<String, TaskSpec>,

    /// Job specs by name
    #[serde(default)]
    pub jobs: HashMap<String, JobSpec>,
}

impl TasksCfg {
    /// Parse and validate a JSON task configuration
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let cfg: TasksCfg = serde_json::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the whole configuration; any error rejects all of it
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!(
            tasks = self.tasks.len(),
            jobs = self.jobs.len(),
            "validating task configuration"
        );

        for (name, spec) in &self.tasks {
            check_priority(&format!("tasks.{}.priority", name), spec.priority)?;
        }

        let mut job_names: Vec<&String> = self.jobs.keys().collect();
        job_names.sort();
        for name in job_names {
            let job = &self.jobs[name];
            check_priority(&format!("jobs.{}.priority", name), job.priority)?;
            if job.task_specs.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("jobs.{}.task_specs", name),
                    message: "must list at least one task spec".to_string(),
                });
            }
            for task in &job.task_specs {
                if !self.tasks.contains_key(task) {
                    return Err(ConfigError::UnknownTaskSpec {
                        job: name.clone(),
                        task: task.clone(),
                    });
                }
            }
        }

        validate_task_graph(&self.tasks)
    }

    /// Get a task spec by name
    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.get(name)
    }

    /// Get a job spec by name
    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.get(name)
    }
}

fn check_priority(field: &str, priority: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&priority) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("priority must be within [0, 1], got {}", priority),
        });
    }
    Ok(())
}

/// Load and validate a task configuration file from disk
pub fn load_tasks_cfg(path: &Path) -> Result<TasksCfg, ConfigError> {
    info!(path = %path.display(), "loading task configuration");
    let contents = std::fs::read_to_string(path)?;
    TasksCfg::parse(&contents)
}
