//! Configuration system for Cadence
//!
//! Two kinds of configuration live here: the service configuration
//! (`cadence.toml` / `cadence.yaml`) and the per-revision task configuration
//! (`tasks.json`) together with its graph validation.

pub mod defaults;
pub mod graph;
mod loader;
mod tasks_cfg;
mod types;
pub mod validation;

pub use defaults::*;
pub use graph::validate_task_graph;
pub use loader::*;
pub use tasks_cfg::*;
pub use types::*;
pub use validation::validate_config;
