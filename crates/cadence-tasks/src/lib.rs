//! Cadence Tasks - Scheduler core
//!
//! This crate provides per-subscriber change tracking for tasks, jobs and
//! comments (with fan-out to mirror trackers), a cache of task configuration
//! keyed by repo state, and execution planning over a validated task graph.

pub mod cache;
pub mod dag;
pub mod modified;

pub use cache::TaskCfgCache;
pub use dag::{TaskDag, TaskNode};
pub use modified::{
    MirrorPolicy, ModifiedCommentSet, ModifiedComments, ModifiedCommentsImpl, ModifiedEntrySet,
    ModifiedJobs, ModifiedJobsImpl, ModifiedTasks, ModifiedTasksImpl, MuxModifiedComments,
    MuxModifiedJobs, MuxModifiedTasks, TrackerSettings,
};
