//! Repository access used to read task configuration at a revision

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RepoError;
use crate::types::RepoState;

/// Raw task configuration read from a repository at a revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// File contents
    pub contents: String,
    /// Commit time of the revision
    pub committed_at: DateTime<Utc>,
}

/// Reads task configuration out of repositories.
///
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait RepoAccess: Send + Sync {
    /// Read the task configuration file at the given repo state
    async fn fetch_tasks_cfg(&self, repo_state: &RepoState) -> Result<ConfigSnapshot, RepoError>;
}
