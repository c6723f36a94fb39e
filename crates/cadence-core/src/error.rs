//! Error types for Cadence

use std::path::PathBuf;
use thiserror::Error;

use crate::types::RepoState;

/// Result type alias using CadenceError
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Main error type for Cadence operations
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Change tracking errors
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Repository access errors
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// Task configuration cache errors
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Git-related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors returned by the modified-data trackers
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The subscriber id was never registered, was stopped, or expired
    #[error("Unknown or expired subscriber id: {0}")]
    UnknownId(String),

    /// Subscriber capacity reached
    #[error("Too many subscribers (limit {0}); is somebody leaking subscriptions?")]
    TooManyUsers(usize),

    /// A write-only mirror of a mux tracker failed
    #[error("Write to mirror tracker {index} failed: {source}")]
    Mirror {
        index: usize,
        #[source]
        source: Box<TrackerError>,
    },

    /// Backend-specific failure (for trackers not backed by memory)
    #[error("Tracker backend error: {0}")]
    Backend(String),
}

impl TrackerError {
    /// Whether the caller should re-subscribe before polling again
    pub fn is_unknown_id(&self) -> bool {
        matches!(self, Self::UnknownId(_))
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// A task depends on a task spec that does not exist
    #[error("Task {task} has unknown dependency {dependency}")]
    UnknownDependency { task: String, dependency: String },

    /// The task graph contains a cycle
    #[error("Circular dependency detected: {from} -> {to}")]
    CircularDependency { from: String, to: String },

    /// A job names a task spec that does not exist
    #[error("Job {job} references unknown task spec {task}")]
    UnknownTaskSpec { job: String, task: String },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found
    #[error("Git repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// Revision does not resolve to a commit
    #[error("Revision not found: {0}")]
    RevisionNotFound(String),

    /// Path does not exist in the tree at a revision
    #[error("File {path} not found at {revision}")]
    FileNotFound { path: String, revision: String },

    /// Blob content is not valid UTF-8
    #[error("File {0} is not valid UTF-8")]
    NotUtf8(String),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Errors from a repo-access collaborator
#[derive(Debug, Error)]
pub enum RepoError {
    /// No checkout registered for this repo URL
    #[error("Unknown repository: {0}")]
    UnknownRepo(String),

    /// Underlying git failure
    #[error(transparent)]
    Git(#[from] GitError),

    /// The blocking read task panicked or was cancelled
    #[error("Repository read task failed: {0}")]
    Join(String),
}

/// Errors from the task configuration cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The configuration at a repo state is malformed
    #[error("Invalid task configuration at {repo_state}: {message}")]
    Config {
        repo_state: RepoState,
        message: String,
    },

    /// Reading the configuration failed
    #[error("Failed to read task configuration at {repo_state}: {source}")]
    Repo {
        repo_state: RepoState,
        #[source]
        source: RepoError,
    },
}

impl CacheError {
    /// The repo state whose configuration failed to load
    pub fn repo_state(&self) -> &RepoState {
        match self {
            Self::Config { repo_state, .. } | Self::Repo { repo_state, .. } => repo_state,
        }
    }
}
