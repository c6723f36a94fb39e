//! Task types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RepoState;

/// Execution status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a bot
    #[default]
    Pending,
    /// Running on a bot
    Running,
    /// Finished successfully
    Success,
    /// Finished with a failure in the task itself
    Failure,
    /// Finished with an infrastructure failure
    Mishap,
}

impl TaskStatus {
    /// Whether the task has finished, successfully or not
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Mishap)
    }
}

/// A single run of a task spec at a repo state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// Name of the task spec this task runs
    pub name: String,
    /// Repo state the task runs against
    pub repo_state: RepoState,
    /// Current status
    #[serde(default)]
    pub status: TaskStatus,
    /// Attempt number, starting at zero
    #[serde(default)]
    pub attempt: u32,
    /// Maximum number of attempts allowed
    #[serde(default)]
    pub max_attempts: u32,
    /// Commits covered by this task (blamelist)
    #[serde(default)]
    pub commits: Vec<String>,
    /// When the task was created
    pub created: DateTime<Utc>,
    /// Free-form properties reported by the task
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Task {
    /// Create a new pending task
    pub fn new(id: impl Into<String>, name: impl Into<String>, repo_state: RepoState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            repo_state,
            status: TaskStatus::Pending,
            attempt: 0,
            max_attempts: 1,
            commits: Vec::new(),
            created: Utc::now(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the blamelist
    pub fn with_commits(mut self, commits: Vec<String>) -> Self {
        self.commits = commits;
        self
    }

    /// Whether another attempt may be scheduled after this one fails
    pub fn can_retry(&self) -> bool {
        matches!(self.status, TaskStatus::Failure | TaskStatus::Mishap)
            && self.attempt + 1 < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "Build-Linux", RepoState::new("repo", "abc"))
            .with_status(TaskStatus::Running)
            .with_commits(vec!["abc".to_string()]);

        assert_eq!(task.id, "t1");
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.commits, vec!["abc"]);
    }

    #[test]
    fn test_task_status_is_done() {
        assert!(!TaskStatus::Pending.is_done());
        assert!(!TaskStatus::Running.is_done());
        assert!(TaskStatus::Success.is_done());
        assert!(TaskStatus::Failure.is_done());
        assert!(TaskStatus::Mishap.is_done());
    }

    #[test]
    fn test_can_retry() {
        let mut task = Task::new("t1", "Test", RepoState::new("repo", "abc"))
            .with_status(TaskStatus::Failure);
        task.max_attempts = 2;
        assert!(task.can_retry());

        task.attempt = 1;
        assert!(!task.can_retry());

        task.attempt = 0;
        task.status = TaskStatus::Success;
        assert!(!task.can_retry());
    }

    #[test]
    fn test_task_serde_defaults() {
        let json = r#"{
            "id": "t1",
            "name": "Test",
            "repo_state": {"repo": "r", "revision": "abc"},
            "created": "2024-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.commits.is_empty());
    }
}
