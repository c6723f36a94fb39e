//! Task configuration cache keyed by repo state

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use cadence_core::config::{TaskCfgConfig, TaskSpec, TasksCfg};
use cadence_core::error::{CacheError, RepoError};
use cadence_core::repo::RepoAccess;
use cadence_core::types::RepoState;

/// Parsed configuration, or the reason it was rejected
#[derive(Debug, Clone)]
enum CachedCfg {
    Valid(Arc<TasksCfg>),
    Invalid(String),
}

#[derive(Debug)]
struct CacheEntry {
    cfg: CachedCfg,
    committed_at: DateTime<Utc>,
}

/// Cache of parsed task configuration per repo state.
///
/// Configurations are fetched on demand through a [`RepoAccess`] and kept
/// until [`TaskCfgCache::cleanup`] evicts them by commit age. A configuration
/// that fails to parse or validate is cached as a permanent error, since the
/// contents at a revision never change. Failures to reach the repository are
/// not cached.
pub struct TaskCfgCache {
    repo_access: Arc<dyn RepoAccess>,
    max_age: Duration,
    entries: Mutex<HashMap<RepoState, CacheEntry>>,
}

impl TaskCfgCache {
    /// Create an empty cache reading through `repo_access`, with the default
    /// retention window
    pub fn new(repo_access: Arc<dyn RepoAccess>) -> Self {
        Self::from_config(repo_access, &TaskCfgConfig::default())
    }

    /// Create an empty cache whose retention window comes from `config`
    pub fn from_config(repo_access: Arc<dyn RepoAccess>, config: &TaskCfgConfig) -> Self {
        Self {
            repo_access,
            max_age: config.max_age(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Retention window used by [`TaskCfgCache::cleanup_expired`]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RepoState, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Task specs for each requested repo state.
    ///
    /// Fails with the error of the first requested state, in request order,
    /// whose configuration could not be produced.
    #[instrument(skip_all, fields(repo_states = repo_states.len()))]
    pub async fn get_task_specs_for_repo_states(
        &self,
        repo_states: &[RepoState],
    ) -> Result<HashMap<RepoState, HashMap<String, TaskSpec>>, CacheError> {
        let mut outcomes = self.resolve(repo_states).await;

        let mut specs = HashMap::with_capacity(outcomes.len());
        for repo_state in repo_states {
            // Duplicates were consumed on their first occurrence.
            if let Some(outcome) = outcomes.remove(repo_state) {
                let cfg = into_result(repo_state, outcome)?;
                specs.insert(repo_state.clone(), cfg.tasks.clone());
            }
        }
        Ok(specs)
    }

    /// Full task configuration at a single repo state
    #[instrument(skip_all, fields(repo_state = %repo_state))]
    pub async fn read_tasks_cfg(&self, repo_state: &RepoState) -> Result<Arc<TasksCfg>, CacheError> {
        let mut outcomes = self.resolve(std::slice::from_ref(repo_state)).await;
        let outcome = outcomes
            .remove(repo_state)
            .unwrap_or_else(|| Err(RepoError::Join("no result for repo state".to_string())));
        into_result(repo_state, outcome)
    }

    /// Look up every requested state, fetching the ones not yet cached
    async fn resolve(
        &self,
        repo_states: &[RepoState],
    ) -> HashMap<RepoState, Result<CachedCfg, RepoError>> {
        let mut outcomes = HashMap::new();
        let mut missing = Vec::new();

        {
            let entries = self.lock();
            for repo_state in repo_states {
                if outcomes.contains_key(repo_state) || missing.contains(repo_state) {
                    continue;
                }
                match entries.get(repo_state) {
                    Some(entry) => {
                        outcomes.insert(repo_state.clone(), Ok(entry.cfg.clone()));
                    }
                    None => missing.push(repo_state.clone()),
                }
            }
        }

        if missing.is_empty() {
            debug!("all repo states cached");
            return outcomes;
        }

        info!(count = missing.len(), "fetching task configurations");

        let mut fetches = JoinSet::new();
        for repo_state in missing.iter().cloned() {
            let repo_access = Arc::clone(&self.repo_access);
            fetches.spawn(async move {
                let snapshot = repo_access.fetch_tasks_cfg(&repo_state).await;
                (repo_state, snapshot)
            });
        }

        let mut fetched = Vec::new();
        let mut join_failure = None;
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((repo_state, Ok(snapshot))) => fetched.push((repo_state, snapshot)),
                Ok((repo_state, Err(e))) => {
                    warn!(repo_state = %repo_state, error = %e, "failed to fetch task configuration");
                    outcomes.insert(repo_state, Err(e));
                }
                Err(e) => {
                    warn!(error = %e, "task configuration fetch did not complete");
                    join_failure = Some(e.to_string());
                }
            }
        }

        let parsed: Vec<(RepoState, CacheEntry)> = fetched
            .into_iter()
            .map(|(repo_state, snapshot)| {
                let cfg = match TasksCfg::parse(&snapshot.contents) {
                    Ok(cfg) => CachedCfg::Valid(Arc::new(cfg)),
                    Err(e) => {
                        warn!(repo_state = %repo_state, error = %e, "rejecting task configuration");
                        CachedCfg::Invalid(e.to_string())
                    }
                };
                let entry = CacheEntry {
                    cfg,
                    committed_at: snapshot.committed_at,
                };
                (repo_state, entry)
            })
            .collect();

        {
            let mut entries = self.lock();
            for (repo_state, entry) in parsed {
                outcomes.insert(repo_state.clone(), Ok(entry.cfg.clone()));
                entries.insert(repo_state, entry);
            }
        }

        // A panicked fetch leaves no result behind for its repo state.
        for repo_state in missing {
            outcomes.entry(repo_state).or_insert_with(|| {
                Err(RepoError::Join(
                    join_failure
                        .clone()
                        .unwrap_or_else(|| "fetch task did not complete".to_string()),
                ))
            });
        }

        outcomes
    }

    /// Evict entries whose commit is older than `max_age`; returns the count
    #[instrument(skip(self))]
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = match chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => {
                warn!(max_age_secs = max_age.as_secs(), "max age out of range; nothing evicted");
                return 0;
            }
        };

        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.committed_at >= cutoff);
        let removed = before - entries.len();

        info!(removed, kept = entries.len(), "task configuration cache cleanup complete");
        removed
    }

    /// Evict entries older than the configured retention window
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup(self.max_age)
    }

    /// Number of cached repo states, including cached errors
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn into_result(
    repo_state: &RepoState,
    outcome: Result<CachedCfg, RepoError>,
) -> Result<Arc<TasksCfg>, CacheError> {
    match outcome {
        Ok(CachedCfg::Valid(cfg)) => Ok(cfg),
        Ok(CachedCfg::Invalid(message)) => Err(CacheError::Config {
            repo_state: repo_state.clone(),
            message,
        }),
        Err(source) => Err(CacheError::Repo {
            repo_state: repo_state.clone(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_core::repo::ConfigSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VALID: &str = r#"{
        "tasks": {
            "Build": {},
            "Test": { "dependencies": ["Build"] }
        },
        "jobs": {
            "Test-All": { "task_specs": ["Test"] }
        }
    }"#;

    const CYCLIC: &str = r#"{
        "tasks": {
            "A": { "dependencies": ["B"] },
            "B": { "dependencies": ["A"] }
        }
    }"#;

    /// In-memory repositories with a fetch counter
    #[derive(Default)]
    struct FakeRepos {
        files: HashMap<RepoState, ConfigSnapshot>,
        fetches: AtomicUsize,
    }

    impl FakeRepos {
        fn with(mut self, repo_state: &RepoState, contents: &str, age: chrono::Duration) -> Self {
            self.files.insert(
                repo_state.clone(),
                ConfigSnapshot {
                    contents: contents.to_string(),
                    committed_at: Utc::now() - age,
                },
            );
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RepoAccess for FakeRepos {
        async fn fetch_tasks_cfg(&self, repo_state: &RepoState) -> Result<ConfigSnapshot, RepoError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(repo_state)
                .cloned()
                .ok_or_else(|| RepoError::UnknownRepo(repo_state.repo.clone()))
        }
    }

    fn rs(revision: &str) -> RepoState {
        RepoState::new("https://example.com/repo.git", revision)
    }

    fn fresh() -> chrono::Duration {
        chrono::Duration::hours(1)
    }

    #[tokio::test]
    async fn test_fetches_each_state_once() {
        let repos = Arc::new(
            FakeRepos::default()
                .with(&rs("a"), VALID, fresh())
                .with(&rs("b"), VALID, fresh()),
        );
        let cache = TaskCfgCache::new(repos.clone());

        let specs = cache
            .get_task_specs_for_repo_states(&[rs("a"), rs("b"), rs("a")])
            .await
            .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[&rs("a")]["Test"].dependencies, vec!["Build"]);
        assert_eq!(repos.fetches(), 2);

        cache
            .get_task_specs_for_repo_states(&[rs("b")])
            .await
            .unwrap();
        assert_eq!(repos.fetches(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_result_restricted_to_requested_states() {
        let repos = Arc::new(
            FakeRepos::default()
                .with(&rs("a"), VALID, fresh())
                .with(&rs("b"), VALID, fresh()),
        );
        let cache = TaskCfgCache::new(repos);

        cache
            .get_task_specs_for_repo_states(&[rs("a"), rs("b")])
            .await
            .unwrap();
        let specs = cache
            .get_task_specs_for_repo_states(&[rs("b")])
            .await
            .unwrap();
        assert_eq!(specs.keys().collect::<Vec<_>>(), vec![&rs("b")]);
    }

    #[tokio::test]
    async fn test_invalid_config_cached_as_permanent_error() {
        let repos = Arc::new(
            FakeRepos::default()
                .with(&rs("good"), VALID, fresh())
                .with(&rs("bad"), CYCLIC, fresh()),
        );
        let cache = TaskCfgCache::new(repos.clone());

        let err = cache
            .get_task_specs_for_repo_states(&[rs("good"), rs("bad")])
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Config { .. }));
        assert_eq!(err.repo_state(), &rs("bad"));
        assert!(err.to_string().contains("Circular dependency"));

        // The valid state fetched alongside is still usable from cache.
        let good = cache.read_tasks_cfg(&rs("good")).await.unwrap();
        assert!(good.job("Test-All").is_some());

        let again = cache.read_tasks_cfg(&rs("bad")).await.unwrap_err();
        assert!(matches!(again, CacheError::Config { .. }));
        assert_eq!(repos.fetches(), 2);
    }

    #[tokio::test]
    async fn test_repo_errors_are_not_cached() {
        let repos = Arc::new(FakeRepos::default().with(&rs("a"), VALID, fresh()));
        let cache = TaskCfgCache::new(repos.clone());

        let err = cache
            .get_task_specs_for_repo_states(&[rs("a"), rs("missing")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Repo {
                source: RepoError::UnknownRepo(_),
                ..
            }
        ));
        assert_eq!(cache.len(), 1);

        cache.read_tasks_cfg(&rs("missing")).await.unwrap_err();
        assert_eq!(repos.fetches(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_by_commit_age() {
        let repos = Arc::new(
            FakeRepos::default()
                .with(&rs("old"), VALID, chrono::Duration::days(10))
                .with(&rs("broken-old"), CYCLIC, chrono::Duration::days(10))
                .with(&rs("new"), VALID, fresh()),
        );
        let cache = TaskCfgCache::new(repos.clone());

        cache.read_tasks_cfg(&rs("old")).await.unwrap();
        cache.read_tasks_cfg(&rs("broken-old")).await.unwrap_err();
        cache.read_tasks_cfg(&rs("new")).await.unwrap();
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.cleanup(Duration::from_secs(4 * 24 * 60 * 60)), 2);
        assert_eq!(cache.len(), 1);

        // Evicted states are fetched again on demand.
        cache.read_tasks_cfg(&rs("old")).await.unwrap();
        assert_eq!(repos.fetches(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_out_of_range_age_keeps_everything() {
        let repos = Arc::new(FakeRepos::default().with(&rs("a"), VALID, fresh()));
        let cache = TaskCfgCache::new(repos);
        cache.read_tasks_cfg(&rs("a")).await.unwrap();

        assert_eq!(cache.cleanup(Duration::MAX), 0);
        assert!(!cache.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired_uses_configured_window() {
        let repos = Arc::new(
            FakeRepos::default()
                .with(&rs("week-old"), VALID, chrono::Duration::days(7))
                .with(&rs("new"), VALID, fresh()),
        );
        let config = TaskCfgConfig {
            max_age_days: 10,
            ..TaskCfgConfig::default()
        };
        let cache = TaskCfgCache::from_config(repos.clone(), &config);
        assert_eq!(cache.max_age(), Duration::from_secs(10 * 24 * 60 * 60));

        cache
            .get_task_specs_for_repo_states(&[rs("week-old"), rs("new")])
            .await
            .unwrap();
        assert_eq!(cache.cleanup_expired(), 0);

        // The default window is four days.
        let cache = TaskCfgCache::new(repos);
        cache
            .get_task_specs_for_repo_states(&[rs("week-old"), rs("new")])
            .await
            .unwrap();
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_huge_configured_window_keeps_everything() {
        let repos = Arc::new(FakeRepos::default().with(&rs("a"), VALID, fresh()));
        let config = TaskCfgConfig {
            max_age_days: u64::MAX,
            ..TaskCfgConfig::default()
        };
        let cache = TaskCfgCache::from_config(repos, &config);
        cache.read_tasks_cfg(&rs("a")).await.unwrap();

        assert_eq!(cache.cleanup_expired(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_request() {
        let cache = TaskCfgCache::new(Arc::new(FakeRepos::default()));
        let specs = cache.get_task_specs_for_repo_states(&[]).await.unwrap();
        assert!(specs.is_empty());
        assert!(cache.is_empty());
    }
}
