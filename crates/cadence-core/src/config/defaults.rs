//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "cadence.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "cadence.yaml";

/// Maximum number of concurrent subscribers per tracker
pub const DEFAULT_MAX_USERS: usize = 1000;

/// Seconds a subscriber may go without polling before it is reaped
pub const DEFAULT_SUBSCRIBER_TIMEOUT_SECS: u64 = 10 * 60;

/// Seconds between reaper sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Days of history kept in the task configuration cache
pub const DEFAULT_TASK_CFG_MAX_AGE_DAYS: u64 = 4;

/// Upper bound accepted for `task_cfg.max_age_days`
pub const MAX_TASK_CFG_MAX_AGE_DAYS: u64 = 10 * 365;

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".cadence.toml",
        ".cadence.yaml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Cadence Configuration

[tracker]
max_users = 1000
subscriber_timeout_secs = 600
sweep_interval_secs = 60

[task_cfg]
path = "infra/bots/tasks.json"
max_age_days = 4

[repos]
# "https://example.com/repo.git" = "/path/to/checkout"
"#;
