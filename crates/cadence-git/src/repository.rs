//! Git repository operations

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::Repository;
use tracing::{debug, info, instrument};

use cadence_core::error::GitError;

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Git repository wrapper
pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::RepositoryNotFound(path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            repo,
        })
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a reference to the inner git2 Repository
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Resolve a revision (hash, branch, tag, ...) to a commit
    pub fn commit(&self, revision: &str) -> Result<git2::Commit<'_>> {
        self.repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| GitError::RevisionNotFound(revision.to_string()))
    }

    /// Commit time of a revision
    pub fn commit_time(&self, revision: &str) -> Result<DateTime<Utc>> {
        let commit = self.commit(revision)?;
        Ok(to_datetime(commit.time()))
    }

    /// Read a UTF-8 file from the tree at a revision
    #[instrument(skip(self))]
    pub fn read_file_at(&self, revision: &str, file: &str) -> Result<String> {
        let commit = self.commit(revision)?;
        let tree = commit.tree()?;
        let entry = tree
            .get_path(Path::new(file))
            .map_err(|_| GitError::FileNotFound {
                path: file.to_string(),
                revision: revision.to_string(),
            })?;
        let blob = entry.to_object(&self.repo)?.peel_to_blob()?;
        debug!(size = blob.size(), "read blob");

        String::from_utf8(blob.content().to_vec()).map_err(|_| GitError::NotUtf8(file.to_string()))
    }
}

fn to_datetime(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}
