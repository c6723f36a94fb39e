//! Comments attached to tasks, task specs and commits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build an identity key from free-text parts and a timestamp.
///
/// Each part is prefixed with its byte length, so parts containing the
/// separator cannot shift into their neighbours.
fn identity_key(parts: &[&str], ts: &DateTime<Utc>) -> String {
    let mut key = String::new();
    for part in parts {
        key.push_str(&format!("{}:{}#", part.len(), part));
    }
    match ts.timestamp_nanos_opt() {
        Some(nanos) => key.push_str(&nanos.to_string()),
        None => key.push_str(&ts.to_rfc3339()),
    }
    key
}

/// A comment on a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    /// Repository URL
    pub repo: String,
    /// Commit the task ran at
    pub revision: String,
    /// Task spec name
    pub name: String,
    /// When the comment was made
    pub timestamp: DateTime<Utc>,
    /// Commented task
    pub task_id: String,
    /// Author
    pub user: String,
    /// Comment text
    pub message: String,
    /// Set when the comment was deleted
    #[serde(default)]
    pub deleted: Option<bool>,
}

impl TaskComment {
    /// Identity key used to coalesce changes to the same comment
    pub fn id(&self) -> String {
        identity_key(
            &[self.repo.as_str(), self.revision.as_str(), self.name.as_str()],
            &self.timestamp,
        )
    }

    /// Stable ordering key
    pub fn sort_key(&self) -> (&str, &str, &str, DateTime<Utc>) {
        (&self.repo, &self.revision, &self.name, self.timestamp)
    }
}

/// A comment on a task spec, across all revisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpecComment {
    /// Repository URL
    pub repo: String,
    /// Task spec name
    pub name: String,
    /// When the comment was made
    pub timestamp: DateTime<Utc>,
    /// Author
    pub user: String,
    /// Whether the task spec is flaky
    #[serde(default)]
    pub flaky: bool,
    /// Whether failures of this task spec should be ignored
    #[serde(default)]
    pub ignore_failure: bool,
    /// Comment text
    pub message: String,
    /// Set when the comment was deleted
    #[serde(default)]
    pub deleted: Option<bool>,
}

impl TaskSpecComment {
    /// Identity key used to coalesce changes to the same comment
    pub fn id(&self) -> String {
        identity_key(&[self.repo.as_str(), self.name.as_str()], &self.timestamp)
    }

    /// Stable ordering key
    pub fn sort_key(&self) -> (&str, &str, DateTime<Utc>) {
        (&self.repo, &self.name, self.timestamp)
    }
}

/// A comment on a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitComment {
    /// Repository URL
    pub repo: String,
    /// Commented commit
    pub revision: String,
    /// When the comment was made
    pub timestamp: DateTime<Utc>,
    /// Author
    pub user: String,
    /// Whether failures at this commit should be ignored
    #[serde(default)]
    pub ignore_failure: bool,
    /// Comment text
    pub message: String,
    /// Set when the comment was deleted
    #[serde(default)]
    pub deleted: Option<bool>,
}

impl CommitComment {
    /// Identity key used to coalesce changes to the same comment
    pub fn id(&self) -> String {
        identity_key(&[self.repo.as_str(), self.revision.as_str()], &self.timestamp)
    }

    /// Stable ordering key
    pub fn sort_key(&self) -> (&str, &str, DateTime<Utc>) {
        (&self.repo, &self.revision, self.timestamp)
    }
}
