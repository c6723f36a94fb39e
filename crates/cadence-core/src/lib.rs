//! Cadence Core - Core library for the Cadence task scheduler
//!
//! This crate provides the domain types tracked by the scheduler, the error
//! taxonomy, service configuration, task configuration parsing and task graph
//! validation, and the repository access trait used to read configuration.

pub mod config;
pub mod error;
pub mod repo;
pub mod types;

pub use config::{JobSpec, TaskSpec, TasksCfg};
pub use error::{CacheError, CadenceError, ConfigError, GitError, RepoError, Result, TrackerError};
pub use repo::{ConfigSnapshot, RepoAccess};
pub use types::{
    CommitComment, Job, JobStatus, RepoState, Task, TaskComment, TaskSpecComment, TaskStatus,
};
