//! Repo access backed by local git checkouts

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};

use cadence_core::config::{Config, DEFAULT_TASKS_CFG_PATH};
use cadence_core::error::RepoError;
use cadence_core::repo::{ConfigSnapshot, RepoAccess};
use cadence_core::types::RepoState;

use crate::repository::GitRepo;

/// Registry of local checkouts, keyed by repository URL.
///
/// Each read opens the checkout on a blocking thread, so the registry can be
/// shared freely between tasks.
#[derive(Debug, Clone)]
pub struct GitRepoAccess {
    checkouts: HashMap<String, PathBuf>,
    cfg_path: String,
}

impl GitRepoAccess {
    /// Create an empty registry reading the default task configuration path
    pub fn new() -> Self {
        Self {
            checkouts: HashMap::new(),
            cfg_path: DEFAULT_TASKS_CFG_PATH.to_string(),
        }
    }

    /// Build a registry from the service configuration
    pub fn from_config(config: &Config) -> Self {
        let mut access = Self::new().with_cfg_path(config.task_cfg.path.clone());
        for (url, path) in &config.repos {
            access.register(url.clone(), path.clone());
        }
        access
    }

    /// Set the task configuration path read from each repository
    pub fn with_cfg_path(mut self, path: impl Into<String>) -> Self {
        self.cfg_path = path.into();
        self
    }

    /// Register a local checkout for a repository URL
    pub fn register(&mut self, url: impl Into<String>, path: impl Into<PathBuf>) {
        self.checkouts.insert(url.into(), path.into());
    }

    /// Registered repository URLs
    pub fn repos(&self) -> impl Iterator<Item = &str> {
        self.checkouts.keys().map(String::as_str)
    }
}

impl Default for GitRepoAccess {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoAccess for GitRepoAccess {
    #[instrument(skip_all, fields(repo_state = %repo_state))]
    async fn fetch_tasks_cfg(&self, repo_state: &RepoState) -> Result<ConfigSnapshot, RepoError> {
        let path = self
            .checkouts
            .get(&repo_state.repo)
            .cloned()
            .ok_or_else(|| RepoError::UnknownRepo(repo_state.repo.clone()))?;
        let revision = repo_state.revision.clone();
        let cfg_path = self.cfg_path.clone();

        let snapshot = tokio::task::spawn_blocking(move || -> Result<ConfigSnapshot, RepoError> {
            let repo = GitRepo::open(&path)?;
            let committed_at = repo.commit_time(&revision)?;
            let contents = repo.read_file_at(&revision, &cfg_path)?;
            Ok(ConfigSnapshot {
                contents,
                committed_at,
            })
        })
        .await
        .map_err(|e| RepoError::Join(e.to_string()))??;

        debug!(bytes = snapshot.contents.len(), "fetched task configuration");
        Ok(snapshot)
    }
}
