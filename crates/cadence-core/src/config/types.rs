//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    DEFAULT_MAX_USERS, DEFAULT_SUBSCRIBER_TIMEOUT_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
    DEFAULT_TASK_CFG_MAX_AGE_DAYS,
};
use super::tasks_cfg::DEFAULT_TASKS_CFG_PATH;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Main configuration for Cadence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modified-data tracker configuration
    pub tracker: TrackerConfig,

    /// Task configuration cache settings
    pub task_cfg: TaskCfgConfig,

    /// Repository URL -> local checkout path
    pub repos: BTreeMap<String, PathBuf>,
}

/// Modified-data tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum number of live subscribers per tracker
    pub max_users: usize,

    /// Seconds a subscriber may go without polling before it is reaped
    pub subscriber_timeout_secs: u64,

    /// Seconds between reaper sweeps
    pub sweep_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_users: DEFAULT_MAX_USERS,
            subscriber_timeout_secs: DEFAULT_SUBSCRIBER_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl TrackerConfig {
    /// Subscriber idle timeout
    pub fn subscriber_timeout(&self) -> Duration {
        Duration::from_secs(self.subscriber_timeout_secs)
    }

    /// Interval between reaper sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Task configuration cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCfgConfig {
    /// Path of the task configuration file inside each repository
    pub path: String,

    /// Entries for commits older than this many days are evicted
    pub max_age_days: u64,
}

impl Default for TaskCfgConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_TASKS_CFG_PATH.to_string(),
            max_age_days: DEFAULT_TASK_CFG_MAX_AGE_DAYS,
        }
    }
}

impl TaskCfgConfig {
    /// Maximum age of cached entries, saturating on overflow
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days.saturating_mul(SECS_PER_DAY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tracker.max_users, 1000);
        assert_eq!(config.tracker.subscriber_timeout(), Duration::from_secs(600));
        assert_eq!(config.tracker.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.task_cfg.path, "infra/bots/tasks.json");
        assert_eq!(config.task_cfg.max_age(), Duration::from_secs(4 * 86400));
        assert!(config.repos.is_empty());
    }

    #[test]
    fn test_max_age_saturates() {
        let task_cfg = TaskCfgConfig {
            max_age_days: u64::MAX / 1000,
            ..TaskCfgConfig::default()
        };
        assert_eq!(task_cfg.max_age(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[tracker]\nmax_users = 5\n").unwrap();
        assert_eq!(config.tracker.max_users, 5);
        assert_eq!(config.tracker.sweep_interval_secs, 60);
        assert_eq!(config.task_cfg.max_age_days, 4);
    }
}
