//! Domain types tracked and scheduled by Cadence

mod comment;
mod job;
mod repo_state;
mod task;

pub use comment::{CommitComment, TaskComment, TaskSpecComment};
pub use job::{Job, JobStatus};
pub use repo_state::RepoState;
pub use task::{Task, TaskStatus};
