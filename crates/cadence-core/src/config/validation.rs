//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::defaults::MAX_TASK_CFG_MAX_AGE_DAYS;
use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_tracker(config)?;
    validate_task_cfg(config)?;
    validate_repos(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_tracker(config: &Config) -> Result<()> {
    if config.tracker.max_users == 0 {
        return Err(ConfigError::InvalidValue {
            field: "tracker.max_users".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.tracker.sweep_interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "tracker.sweep_interval_secs".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.tracker.subscriber_timeout_secs < config.tracker.sweep_interval_secs {
        return Err(ConfigError::InvalidValue {
            field: "tracker.subscriber_timeout_secs".to_string(),
            message: "must not be shorter than the sweep interval".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_task_cfg(config: &Config) -> Result<()> {
    if config.task_cfg.path.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "task_cfg.path".to_string(),
            message: "path cannot be empty".to_string(),
        }
        .into());
    }

    if config.task_cfg.max_age_days == 0 {
        return Err(ConfigError::InvalidValue {
            field: "task_cfg.max_age_days".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.task_cfg.max_age_days > MAX_TASK_CFG_MAX_AGE_DAYS {
        return Err(ConfigError::InvalidValue {
            field: "task_cfg.max_age_days".to_string(),
            message: format!("must be at most {}", MAX_TASK_CFG_MAX_AGE_DAYS),
        }
        .into());
    }

    Ok(())
}

fn validate_repos(config: &Config) -> Result<()> {
    for (url, path) in &config.repos {
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repos".to_string(),
                message: "repository URL cannot be empty".to_string(),
            }
            .into());
        }
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("repos.{}", url),
                message: "checkout path cannot be empty".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
