//! Modified-data tracking for tasks, jobs and comments
//!
//! Consumers subscribe with `start_tracking_modified_*`, poll with
//! `get_modified_*` and unsubscribe with `stop_tracking_modified_*`. Each poll
//! returns what changed since the previous poll for that subscriber. This is a
//! best-effort notification layer: it lives in memory and is not a source of
//! truth.

mod comments;
mod entry_set;
mod jobs;
mod mux;
mod tasks;

use cadence_core::error::TrackerError;
use cadence_core::types::{CommitComment, Job, Task, TaskComment, TaskSpecComment};

pub use comments::{ModifiedCommentSet, ModifiedCommentsImpl};
pub use entry_set::{ModifiedEntrySet, TrackerSettings};
pub use jobs::ModifiedJobsImpl;
pub use mux::{MirrorPolicy, MuxModifiedComments, MuxModifiedJobs, MuxModifiedTasks};
pub use tasks::ModifiedTasksImpl;

/// Change feed of tasks
pub trait ModifiedTasks: Send + Sync {
    /// Subscribe and return a subscriber id
    fn start_tracking_modified_tasks(&self) -> Result<String, TrackerError>;

    /// Unsubscribe; unknown ids are ignored
    fn stop_tracking_modified_tasks(&self, id: &str);

    /// Tasks changed since the last call for `id`, sorted by task id
    fn get_modified_tasks(&self, id: &str) -> Result<Vec<Task>, TrackerError>;

    /// Record a changed task
    fn track_modified_task(&self, task: &Task) -> Result<(), TrackerError>;

    /// Record several changed tasks
    fn track_modified_tasks(&self, tasks: &[Task]) -> Result<(), TrackerError> {
        tasks.iter().try_for_each(|task| self.track_modified_task(task))
    }
}

/// Change feed of jobs
pub trait ModifiedJobs: Send + Sync {
    /// Subscribe and return a subscriber id
    fn start_tracking_modified_jobs(&self) -> Result<String, TrackerError>;

    /// Unsubscribe; unknown ids are ignored
    fn stop_tracking_modified_jobs(&self, id: &str);

    /// Jobs changed since the last call for `id`, sorted by job id
    fn get_modified_jobs(&self, id: &str) -> Result<Vec<Job>, TrackerError>;

    /// Record a changed job
    fn track_modified_job(&self, job: &Job) -> Result<(), TrackerError>;

    /// Record several changed jobs
    fn track_modified_jobs(&self, jobs: &[Job]) -> Result<(), TrackerError> {
        jobs.iter().try_for_each(|job| self.track_modified_job(job))
    }
}

/// Change feed of task, task spec and commit comments
pub trait ModifiedComments: Send + Sync {
    /// Subscribe and return a subscriber id
    fn start_tracking_modified_comments(&self) -> Result<String, TrackerError>;

    /// Unsubscribe; unknown ids are ignored
    fn stop_tracking_modified_comments(&self, id: &str);

    /// Comments changed since the last call for `id`
    fn get_modified_comments(&self, id: &str) -> Result<ModifiedCommentSet, TrackerError>;

    /// Record a changed task comment
    fn track_modified_task_comment(&self, comment: &TaskComment) -> Result<(), TrackerError>;

    /// Record a changed task spec comment
    fn track_modified_task_spec_comment(
        &self,
        comment: &TaskSpecComment,
    ) -> Result<(), TrackerError>;

    /// Record a changed commit comment
    fn track_modified_commit_comment(&self, comment: &CommitComment) -> Result<(), TrackerError>;
}

/// Take ownership of a drained snapshot, copying only if it is still shared
pub(crate) fn into_owned<T: Clone>(entry: std::sync::Arc<T>) -> T {
    std::sync::Arc::try_unwrap(entry).unwrap_or_else(|shared| (*shared).clone())
}
