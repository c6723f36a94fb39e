//! In-memory task change feed

use cadence_core::error::TrackerError;
use cadence_core::types::Task;

use super::entry_set::{ModifiedEntrySet, TrackerSettings};
use super::{into_owned, ModifiedTasks};

/// [`ModifiedTasks`] backed by a [`ModifiedEntrySet`]
pub struct ModifiedTasksImpl {
    set: ModifiedEntrySet<Task>,
}

impl ModifiedTasksImpl {
    /// Create a task tracker with default settings
    pub fn new() -> Self {
        Self::with_settings(TrackerSettings::default())
    }

    /// Create a task tracker with explicit settings
    pub fn with_settings(settings: TrackerSettings) -> Self {
        Self {
            set: ModifiedEntrySet::with_settings("modified-tasks", settings),
        }
    }
}

impl Default for ModifiedTasksImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifiedTasks for ModifiedTasksImpl {
    fn start_tracking_modified_tasks(&self) -> Result<String, TrackerError> {
        self.set.start_tracking()
    }

    fn stop_tracking_modified_tasks(&self, id: &str) {
        self.set.stop_tracking(id);
    }

    fn get_modified_tasks(&self, id: &str) -> Result<Vec<Task>, TrackerError> {
        let mut tasks: Vec<Task> = self
            .set
            .get_modified(id)?
            .into_values()
            .map(into_owned)
            .collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    fn track_modified_task(&self, task: &Task) -> Result<(), TrackerError> {
        self.set.track_modified(task.id.clone(), task.clone());
        Ok(())
    }

    fn track_modified_tasks(&self, tasks: &[Task]) -> Result<(), TrackerError> {
        self.set
            .track_modified_batch(tasks.iter().map(|t| (t.id.clone(), t.clone())));
        Ok(())
    }
}
