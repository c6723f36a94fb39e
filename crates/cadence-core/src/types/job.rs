//! Job types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RepoState;

/// Execution status of a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Some tasks have not finished
    #[default]
    InProgress,
    /// All tasks succeeded
    Success,
    /// At least one task failed
    Failure,
    /// At least one task hit an infrastructure failure
    Mishap,
    /// Cancelled before completion
    Canceled,
}

/// A requested set of tasks at a repo state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: String,
    /// Name of the job spec
    pub name: String,
    /// Repo state the job runs against
    pub repo_state: RepoState,
    /// Current status
    #[serde(default)]
    pub status: JobStatus,
    /// Scheduling priority in [0, 1]
    #[serde(default)]
    pub priority: f64,
    /// When the job was created
    pub created: DateTime<Utc>,
    /// Task spec name -> names of the task specs it depends on
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Task spec name -> ids of the tasks run for it
    #[serde(default)]
    pub tasks: BTreeMap<String, Vec<String>>,
}

impl Job {
    /// Create a new in-progress job
    pub fn new(id: impl Into<String>, name: impl Into<String>, repo_state: RepoState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            repo_state,
            status: JobStatus::InProgress,
            priority: 0.5,
            created: Utc::now(),
            dependencies: BTreeMap::new(),
            tasks: BTreeMap::new(),
        }
    }

    /// Whether the job has reached a final status
    pub fn is_done(&self) -> bool {
        self.status != JobStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_in_progress() {
        let job = Job::new("j1", "Build-All", RepoState::new("repo", "abc"));
        assert_eq!(job.status, JobStatus::InProgress);
        assert!(!job.is_done());
    }

    #[test]
    fn test_job_done() {
        let mut job = Job::new("j1", "Build-All", RepoState::new("repo", "abc"));
        job.status = JobStatus::Canceled;
        assert!(job.is_done());
    }
}
