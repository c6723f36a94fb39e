//! Trackers that fan writes out to several backends
//!
//! A mux wraps one read-write tracker, which serves subscriptions and
//! polling, and any number of write-only mirrors, which receive every change
//! but are never read through the mux.

use std::sync::Arc;

use tracing::warn;

use cadence_core::error::TrackerError;
use cadence_core::types::{CommitComment, Job, Task, TaskComment, TaskSpecComment};

use super::{ModifiedCommentSet, ModifiedComments, ModifiedJobs, ModifiedTasks};

/// How a mux treats failed writes to its write-only trackers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MirrorPolicy {
    /// Log the failure and carry on
    #[default]
    BestEffort,
    /// Write to every mirror, then report the first failure
    Required,
}

/// Write to the primary, then to each mirror in order
fn write_through<T: ?Sized>(
    policy: MirrorPolicy,
    feed: &'static str,
    primary: &T,
    mirrors: &[Arc<T>],
    write: impl Fn(&T) -> Result<(), TrackerError>,
) -> Result<(), TrackerError> {
    write(primary)?;

    let mut first_failure = None;
    for (index, mirror) in mirrors.iter().enumerate() {
        if let Err(e) = write(mirror.as_ref()) {
            warn!(feed, mirror = index, error = %e, "write to mirror tracker failed");
            if policy == MirrorPolicy::Required && first_failure.is_none() {
                first_failure = Some(TrackerError::Mirror {
                    index,
                    source: Box::new(e),
                });
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Task tracker with write-only mirrors
pub struct MuxModifiedTasks {
    rw: Arc<dyn ModifiedTasks>,
    wo: Vec<Arc<dyn ModifiedTasks>>,
    policy: MirrorPolicy,
}

impl MuxModifiedTasks {
    pub fn new(rw: Arc<dyn ModifiedTasks>, wo: Vec<Arc<dyn ModifiedTasks>>) -> Self {
        Self {
            rw,
            wo,
            policy: MirrorPolicy::default(),
        }
    }

    /// Set how mirror failures are handled
    pub fn with_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl ModifiedTasks for MuxModifiedTasks {
    fn start_tracking_modified_tasks(&self) -> Result<String, TrackerError> {
        self.rw.start_tracking_modified_tasks()
    }

    fn stop_tracking_modified_tasks(&self, id: &str) {
        self.rw.stop_tracking_modified_tasks(id);
    }

    fn get_modified_tasks(&self, id: &str) -> Result<Vec<Task>, TrackerError> {
        self.rw.get_modified_tasks(id)
    }

    fn track_modified_task(&self, task: &Task) -> Result<(), TrackerError> {
        write_through(self.policy, "tasks", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_task(task)
        })
    }

    fn track_modified_tasks(&self, tasks: &[Task]) -> Result<(), TrackerError> {
        write_through(self.policy, "tasks", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_tasks(tasks)
        })
    }
}

/// Job tracker with write-only mirrors
pub struct MuxModifiedJobs {
    rw: Arc<dyn ModifiedJobs>,
    wo: Vec<Arc<dyn ModifiedJobs>>,
    policy: MirrorPolicy,
}

impl MuxModifiedJobs {
    pub fn new(rw: Arc<dyn ModifiedJobs>, wo: Vec<Arc<dyn ModifiedJobs>>) -> Self {
        Self {
            rw,
            wo,
            policy: MirrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl ModifiedJobs for MuxModifiedJobs {
    fn start_tracking_modified_jobs(&self) -> Result<String, TrackerError> {
        self.rw.start_tracking_modified_jobs()
    }

    fn stop_tracking_modified_jobs(&self, id: &str) {
        self.rw.stop_tracking_modified_jobs(id);
    }

    fn get_modified_jobs(&self, id: &str) -> Result<Vec<Job>, TrackerError> {
        self.rw.get_modified_jobs(id)
    }

    fn track_modified_job(&self, job: &Job) -> Result<(), TrackerError> {
        write_through(self.policy, "jobs", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_job(job)
        })
    }

    fn track_modified_jobs(&self, jobs: &[Job]) -> Result<(), TrackerError> {
        write_through(self.policy, "jobs", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_jobs(jobs)
        })
    }
}

/// Comment tracker with write-only mirrors
pub struct MuxModifiedComments {
    rw: Arc<dyn ModifiedComments>,
    wo: Vec<Arc<dyn ModifiedComments>>,
    policy: MirrorPolicy,
}

impl MuxModifiedComments {
    pub fn new(rw: Arc<dyn ModifiedComments>, wo: Vec<Arc<dyn ModifiedComments>>) -> Self {
        Self {
            rw,
            wo,
            policy: MirrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MirrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl ModifiedComments for MuxModifiedComments {
    fn start_tracking_modified_comments(&self) -> Result<String, TrackerError> {
        self.rw.start_tracking_modified_comments()
    }

    fn stop_tracking_modified_comments(&self, id: &str) {
        self.rw.stop_tracking_modified_comments(id);
    }

    fn get_modified_comments(&self, id: &str) -> Result<ModifiedCommentSet, TrackerError> {
        self.rw.get_modified_comments(id)
    }

    fn track_modified_task_comment(&self, comment: &TaskComment) -> Result<(), TrackerError> {
        write_through(self.policy, "comments", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_task_comment(comment)
        })
    }

    fn track_modified_task_spec_comment(
        &self,
        comment: &TaskSpecComment,
    ) -> Result<(), TrackerError> {
        write_through(self.policy, "comments", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_task_spec_comment(comment)
        })
    }

    fn track_modified_commit_comment(&self, comment: &CommitComment) -> Result<(), TrackerError> {
        write_through(self.policy, "comments", self.rw.as_ref(), &self.wo, |t| {
            t.track_modified_commit_comment(comment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modified::{ModifiedCommentsImpl, ModifiedJobsImpl, ModifiedTasksImpl};
    use cadence_core::types::{RepoState, TaskStatus};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn task(id: &str) -> Task {
        Task::new(id, "Build-Linux", RepoState::new("repo", "abc"))
    }

    /// Task tracker whose writes always fail
    #[derive(Default)]
    struct FailingTasks {
        writes: AtomicUsize,
    }

    impl ModifiedTasks for FailingTasks {
        fn start_tracking_modified_tasks(&self) -> Result<String, TrackerError> {
            Err(TrackerError::Backend("unavailable".to_string()))
        }

        fn stop_tracking_modified_tasks(&self, _id: &str) {}

        fn get_modified_tasks(&self, id: &str) -> Result<Vec<Task>, TrackerError> {
            Err(TrackerError::UnknownId(id.to_string()))
        }

        fn track_modified_task(&self, _task: &Task) -> Result<(), TrackerError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(TrackerError::Backend("unavailable".to_string()))
        }
    }

    #[test]
    fn test_tasks_reach_every_mirror() {
        let primary = Arc::new(ModifiedTasksImpl::new());
        let mirrors: Vec<Arc<ModifiedTasksImpl>> =
            (0..3).map(|_| Arc::new(ModifiedTasksImpl::new())).collect();

        let mux = MuxModifiedTasks::new(
            primary.clone(),
            mirrors
                .iter()
                .map(|m| m.clone() as Arc<dyn ModifiedTasks>)
                .collect(),
        );

        let primary_id = mux.start_tracking_modified_tasks().unwrap();
        let mirror_ids: Vec<String> = mirrors
            .iter()
            .map(|m| m.start_tracking_modified_tasks().unwrap())
            .collect();

        let changed = task("t1").with_status(TaskStatus::Running);
        mux.track_modified_task(&changed).unwrap();

        assert_eq!(
            mux.get_modified_tasks(&primary_id).unwrap(),
            vec![changed.clone()]
        );
        for (mirror, id) in mirrors.iter().zip(&mirror_ids) {
            assert_eq!(mirror.get_modified_tasks(id).unwrap(), vec![changed.clone()]);
        }
    }

    #[test]
    fn test_subscriptions_only_touch_primary() {
        let primary = Arc::new(ModifiedTasksImpl::new());
        let mirror = Arc::new(FailingTasks::default());
        let mux = MuxModifiedTasks::new(primary, vec![mirror as Arc<dyn ModifiedTasks>]);

        // The failing mirror would reject a subscription if it were asked.
        let id = mux.start_tracking_modified_tasks().unwrap();
        assert!(mux.get_modified_tasks(&id).unwrap().is_empty());
        mux.stop_tracking_modified_tasks(&id);
        assert!(mux.get_modified_tasks(&id).unwrap_err().is_unknown_id());
    }

    #[test]
    fn test_best_effort_ignores_mirror_failure() {
        let primary = Arc::new(ModifiedTasksImpl::new());
        let failing = Arc::new(FailingTasks::default());
        let healthy = Arc::new(ModifiedTasksImpl::new());
        let mux = MuxModifiedTasks::new(
            primary,
            vec![
                failing.clone() as Arc<dyn ModifiedTasks>,
                healthy.clone() as Arc<dyn ModifiedTasks>,
            ],
        );

        let id = mux.start_tracking_modified_tasks().unwrap();
        let healthy_id = healthy.start_tracking_modified_tasks().unwrap();

        mux.track_modified_task(&task("t1")).unwrap();

        assert_eq!(failing.writes.load(Ordering::SeqCst), 1);
        assert_eq!(mux.get_modified_tasks(&id).unwrap().len(), 1);
        assert_eq!(healthy.get_modified_tasks(&healthy_id).unwrap().len(), 1);
    }

    #[test]
    fn test_required_reports_first_mirror_failure() {
        let primary = Arc::new(ModifiedTasksImpl::new());
        let healthy = Arc::new(ModifiedTasksImpl::new());
        let first = Arc::new(FailingTasks::default());
        let second = Arc::new(FailingTasks::default());
        let mux = MuxModifiedTasks::new(
            primary,
            vec![
                healthy.clone() as Arc<dyn ModifiedTasks>,
                first.clone() as Arc<dyn ModifiedTasks>,
                second.clone() as Arc<dyn ModifiedTasks>,
            ],
        )
        .with_policy(MirrorPolicy::Required);

        let id = mux.start_tracking_modified_tasks().unwrap();
        let healthy_id = healthy.start_tracking_modified_tasks().unwrap();

        let err = mux.track_modified_task(&task("t1")).unwrap_err();
        assert!(matches!(err, TrackerError::Mirror { index: 1, .. }));

        // Every mirror was still attempted and the primary kept the write.
        assert_eq!(first.writes.load(Ordering::SeqCst), 1);
        assert_eq!(second.writes.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.get_modified_tasks(&healthy_id).unwrap().len(), 1);
        assert_eq!(mux.get_modified_tasks(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_primary_failure_skips_mirrors() {
        let primary = Arc::new(FailingTasks::default());
        let mirror = Arc::new(FailingTasks::default());
        let mux = MuxModifiedTasks::new(primary, vec![mirror.clone() as Arc<dyn ModifiedTasks>]);

        assert!(matches!(
            mux.track_modified_task(&task("t1")),
            Err(TrackerError::Backend(_))
        ));
        assert_eq!(mirror.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_jobs_batch_reaches_mirrors() {
        let primary = Arc::new(ModifiedJobsImpl::new());
        let mirror = Arc::new(ModifiedJobsImpl::new());
        let mux = MuxModifiedJobs::new(primary, vec![mirror.clone() as Arc<dyn ModifiedJobs>]);

        let id = mux.start_tracking_modified_jobs().unwrap();
        let mirror_id = mirror.start_tracking_modified_jobs().unwrap();

        let jobs = vec![
            Job::new("j1", "Test-All", RepoState::new("repo", "abc")),
            Job::new("j2", "Perf-All", RepoState::new("repo", "abc")),
        ];
        mux.track_modified_jobs(&jobs).unwrap();

        assert_eq!(mux.get_modified_jobs(&id).unwrap(), jobs);
        assert_eq!(mirror.get_modified_jobs(&mirror_id).unwrap(), jobs);
    }

    #[test]
    fn test_comments_reach_mirrors() {
        let primary = Arc::new(ModifiedCommentsImpl::new());
        let mirrors: Vec<Arc<ModifiedCommentsImpl>> =
            (0..3).map(|_| Arc::new(ModifiedCommentsImpl::new())).collect();
        let mux = MuxModifiedComments::new(
            primary,
            mirrors
                .iter()
                .map(|m| m.clone() as Arc<dyn ModifiedComments>)
                .collect(),
        );

        let id = mux.start_tracking_modified_comments().unwrap();
        let mirror_ids: Vec<String> = mirrors
            .iter()
            .map(|m| m.start_tracking_modified_comments().unwrap())
            .collect();

        let comment = CommitComment {
            repo: "repo".to_string(),
            revision: "abc".to_string(),
            timestamp: Utc.timestamp_opt(100, 0).unwrap(),
            user: "alice@example.com".to_string(),
            ignore_failure: false,
            message: "reverted".to_string(),
            deleted: None,
        };
        mux.track_modified_commit_comment(&comment).unwrap();

        let expected = mux.get_modified_comments(&id).unwrap();
        assert_eq!(expected.commit_comments, vec![comment]);
        for (mirror, mirror_id) in mirrors.iter().zip(&mirror_ids) {
            assert_eq!(mirror.get_modified_comments(mirror_id).unwrap(), expected);
        }
    }
}
