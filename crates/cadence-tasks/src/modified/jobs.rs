//! In-memory job change feed

use cadence_core::error::TrackerError;
use cadence_core::types::Job;

use super::entry_set::{ModifiedEntrySet, TrackerSettings};
use super::{into_owned, ModifiedJobs};

/// [`ModifiedJobs`] backed by a [`ModifiedEntrySet`]
pub struct ModifiedJobsImpl {
    set: ModifiedEntrySet<Job>,
}

impl ModifiedJobsImpl {
    pub fn new() -> Self {
        Self::with_settings(TrackerSettings::default())
    }

    pub fn with_settings(settings: TrackerSettings) -> Self {
        Self {
            set: ModifiedEntrySet::with_settings("modified-jobs", settings),
        }
    }
}

impl Default for ModifiedJobsImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifiedJobs for ModifiedJobsImpl {
    fn start_tracking_modified_jobs(&self) -> Result<String, TrackerError> {
        self.set.start_tracking()
    }

    fn stop_tracking_modified_jobs(&self, id: &str) {
        self.set.stop_tracking(id);
    }

    fn get_modified_jobs(&self, id: &str) -> Result<Vec<Job>, TrackerError> {
        let mut jobs: Vec<Job> = self
            .set
            .get_modified(id)?
            .into_values()
            .map(into_owned)
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(jobs)
    }

    fn track_modified_job(&self, job: &Job) -> Result<(), TrackerError> {
        self.set.track_modified(job.id.clone(), job.clone());
        Ok(())
    }

    fn track_modified_jobs(&self, jobs: &[Job]) -> Result<(), TrackerError> {
        self.set
            .track_modified_batch(jobs.iter().map(|j| (j.id.clone(), j.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::{JobStatus, RepoState};

    fn job(id: &str) -> Job {
        Job::new(id, "Test-All", RepoState::new("repo", "abc"))
    }

    #[test]
    fn test_track_and_drain() {
        let tracker = ModifiedJobsImpl::new();
        let id = tracker.start_tracking_modified_jobs().unwrap();

        let mut original = job("j2");
        original
            .tasks
            .insert("Build".to_string(), vec!["t1".to_string()]);
        tracker
            .track_modified_jobs(&[original.clone(), job("j1")])
            .unwrap();

        original.status = JobStatus::Failure;
        original.tasks.clear();

        let drained = tracker.get_modified_jobs(&id).unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, "j1");
        assert_eq!(drained[1].id, "j2");
        assert_eq!(drained[1].status, JobStatus::InProgress);
        assert_eq!(drained[1].tasks["Build"], vec!["t1"]);
    }

    #[test]
    fn test_stop_tracking() {
        let tracker = ModifiedJobsImpl::new();
        let id = tracker.start_tracking_modified_jobs().unwrap();
        tracker.stop_tracking_modified_jobs(&id);

        tracker.track_modified_job(&job("j1")).unwrap();
        assert!(tracker.get_modified_jobs(&id).unwrap_err().is_unknown_id());
    }

    #[test]
    fn test_too_many_users() {
        let tracker = ModifiedJobsImpl::with_settings(TrackerSettings {
            max_users: 1,
            ..TrackerSettings::default()
        });
        tracker.start_tracking_modified_jobs().unwrap();
        assert!(matches!(
            tracker.start_tracking_modified_jobs(),
            Err(TrackerError::TooManyUsers(1))
        ));
    }
}
