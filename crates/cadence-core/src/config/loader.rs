//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in a directory or its parents
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults
pub fn load_config_or_default(dir: &Path) -> (Config, Option<PathBuf>) {
    match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "no usable config found, using defaults");
            (Config::default(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cadence.toml");
        std::fs::write(&config_path, "[tracker]\nmax_users = 10\n").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cadence.yaml");
        std::fs::write(&config_path, "tracker:\n  max_users: 10\n").unwrap();
        let sub = temp.path().join("a").join("b");
        std::fs::create_dir_all(&sub).unwrap();

        assert_eq!(find_config(&sub), Some(config_path));
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cadence.toml");
        std::fs::write(
            &config_path,
            "[tracker]\nmax_users = 10\n\n[repos]\n\"https://example.com/r.git\" = \"/src/r\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.tracker.max_users, 10);
        assert_eq!(
            config.repos.get("https://example.com/r.git"),
            Some(&PathBuf::from("/src/r"))
        );
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cadence.yaml");
        std::fs::write(
            &config_path,
            "task_cfg:\n  path: tasks.json\n  max_age_days: 7\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.task_cfg.path, "tasks.json");
        assert_eq!(config.task_cfg.max_age_days, 7);
    }

    #[test]
    fn test_load_config_invalid_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cadence.toml");
        std::fs::write(&config_path, "[tracker]\nmax_users = 0\n").unwrap();

        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path());
        assert!(path.is_none());
        assert_eq!(config.tracker.max_users, 1000);
    }
}
