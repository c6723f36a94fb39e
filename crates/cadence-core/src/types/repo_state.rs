//! Repository state

use std::fmt;

use serde::{Deserialize, Serialize};

/// A repository at a particular revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoState {
    /// Repository URL
    pub repo: String,
    /// Commit hash
    pub revision: String,
}

impl RepoState {
    /// Create a new repo state
    pub fn new(repo: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
        }
    }

    /// Check that both fields are set
    pub fn is_valid(&self) -> bool {
        !self.repo.is_empty() && !self.revision.is_empty()
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo, self.revision)
    }
}
