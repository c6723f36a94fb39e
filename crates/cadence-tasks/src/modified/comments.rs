//! In-memory comment change feed
//!
//! Task, task spec and commit comments are tracked in three independent sets.
//! A comment subscriber holds one id per set, joined with `#` into a single
//! id. Underlying ids are UUIDs and never contain the delimiter.

use tracing::warn;

use cadence_core::error::TrackerError;
use cadence_core::types::{CommitComment, TaskComment, TaskSpecComment};

use super::entry_set::{ModifiedEntrySet, TrackerSettings};
use super::{into_owned, ModifiedComments};

const ID_DELIMITER: char = '#';

/// Comments changed since a subscriber's previous poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedCommentSet {
    pub task_comments: Vec<TaskComment>,
    pub task_spec_comments: Vec<TaskSpecComment>,
    pub commit_comments: Vec<CommitComment>,
}

impl ModifiedCommentSet {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.task_comments.is_empty()
            && self.task_spec_comments.is_empty()
            && self.commit_comments.is_empty()
    }
}

/// [`ModifiedComments`] backed by three [`ModifiedEntrySet`]s
pub struct ModifiedCommentsImpl {
    task_comments: ModifiedEntrySet<TaskComment>,
    task_spec_comments: ModifiedEntrySet<TaskSpecComment>,
    commit_comments: ModifiedEntrySet<CommitComment>,
}

impl ModifiedCommentsImpl {
    pub fn new() -> Self {
        Self::with_settings(TrackerSettings::default())
    }

    pub fn with_settings(settings: TrackerSettings) -> Self {
        Self {
            task_comments: ModifiedEntrySet::with_settings("modified-task-comments", settings),
            task_spec_comments: ModifiedEntrySet::with_settings(
                "modified-task-spec-comments",
                settings,
            ),
            commit_comments: ModifiedEntrySet::with_settings("modified-commit-comments", settings),
        }
    }

    /// Split a composite id into its three parts
    fn split_id(id: &str) -> Result<[&str; 3], TrackerError> {
        let parts: Vec<&str> = id.split(ID_DELIMITER).collect();
        match parts.as_slice() {
            [task, task_spec, commit]
                if !task.is_empty() && !task_spec.is_empty() && !commit.is_empty() =>
            {
                Ok([*task, *task_spec, *commit])
            }
            _ => Err(TrackerError::UnknownId(id.to_string())),
        }
    }

    fn release(&self, task: &str, task_spec: &str, commit: &str) {
        self.task_comments.stop_tracking(task);
        self.task_spec_comments.stop_tracking(task_spec);
        self.commit_comments.stop_tracking(commit);
    }
}

impl Default for ModifiedCommentsImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifiedComments for ModifiedCommentsImpl {
    fn start_tracking_modified_comments(&self) -> Result<String, TrackerError> {
        let task_id = self.task_comments.start_tracking()?;

        let task_spec_id = match self.task_spec_comments.start_tracking() {
            Ok(id) => id,
            Err(e) => {
                self.task_comments.stop_tracking(&task_id);
                return Err(e);
            }
        };

        let commit_id = match self.commit_comments.start_tracking() {
            Ok(id) => id,
            Err(e) => {
                self.task_comments.stop_tracking(&task_id);
                self.task_spec_comments.stop_tracking(&task_spec_id);
                return Err(e);
            }
        };

        Ok(format!(
            "{}{d}{}{d}{}",
            task_id,
            task_spec_id,
            commit_id,
            d = ID_DELIMITER
        ))
    }

    fn stop_tracking_modified_comments(&self, id: &str) {
        match Self::split_id(id) {
            Ok([task, task_spec, commit]) => self.release(task, task_spec, commit),
            Err(_) => warn!(subscriber = %id, "ignoring malformed comment subscriber id"),
        }
    }

    fn get_modified_comments(&self, id: &str) -> Result<ModifiedCommentSet, TrackerError> {
        let [task, task_spec, commit] = Self::split_id(id)?;

        // Nothing is drained unless all three parts are still live.
        if !(self.task_comments.is_tracking(task)
            && self.task_spec_comments.is_tracking(task_spec)
            && self.commit_comments.is_tracking(commit))
        {
            warn!(subscriber = %id, "comment subscriber partially expired; releasing it");
            self.release(task, task_spec, commit);
            return Err(TrackerError::UnknownId(id.to_string()));
        }

        let drained = self.task_comments.get_modified(task).and_then(|tasks| {
            let specs = self.task_spec_comments.get_modified(task_spec)?;
            let commits = self.commit_comments.get_modified(commit)?;
            Ok((tasks, specs, commits))
        });
        let (tasks, specs, commits) = match drained {
            Ok(drained) => drained,
            Err(_) => {
                // Expired between the check and the drain.
                self.release(task, task_spec, commit);
                return Err(TrackerError::UnknownId(id.to_string()));
            }
        };

        let mut task_comments: Vec<TaskComment> =
            tasks.into_values().map(into_owned).collect();
        task_comments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut task_spec_comments: Vec<TaskSpecComment> =
            specs.into_values().map(into_owned).collect();
        task_spec_comments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut commit_comments: Vec<CommitComment> =
            commits.into_values().map(into_owned).collect();
        commit_comments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        Ok(ModifiedCommentSet {
            task_comments,
            task_spec_comments,
            commit_comments,
        })
    }

    fn track_modified_task_comment(&self, comment: &TaskComment) -> Result<(), TrackerError> {
        self.task_comments
            .track_modified(comment.id(), comment.clone());
        Ok(())
    }

    fn track_modified_task_spec_comment(
        &self,
        comment: &TaskSpecComment,
    ) -> Result<(), TrackerError> {
        self.task_spec_comments
            .track_modified(comment.id(), comment.clone());
        Ok(())
    }

    fn track_modified_commit_comment(&self, comment: &CommitComment) -> Result<(), TrackerError> {
        self.commit_comments
            .track_modified(comment.id(), comment.clone());
        Ok(())
    }
}
