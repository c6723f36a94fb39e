//! Task graph validation
//!
//! A task configuration is a directed graph where an edge `a -> b` means task
//! `a` depends on task `b`. Before a configuration can be scheduled every
//! dependency must name a task in the same configuration and the graph must be
//! acyclic.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::error::ConfigError;

use super::tasks_cfg::TaskSpec;

/// DFS marking state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate the dependency graph of a set of task specs.
///
/// Fails with [`ConfigError::UnknownDependency`] if a task names a dependency
/// that is not in `tasks`, and with [`ConfigError::CircularDependency`] naming
/// the back edge if the graph has a cycle (including self-loops).
#[instrument(skip_all, fields(task_count = tasks.len()))]
pub fn validate_task_graph(tasks: &HashMap<String, TaskSpec>) -> Result<(), ConfigError> {
    check_dependencies_exist(tasks)?;
    check_for_cycles(tasks)?;
    debug!("task graph is a valid DAG");
    Ok(())
}

fn check_dependencies_exist(tasks: &HashMap<String, TaskSpec>) -> Result<(), ConfigError> {
    for name in sorted_names(tasks) {
        for dep in &tasks[name].dependencies {
            if !tasks.contains_key(dep) {
                return Err(ConfigError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_for_cycles(tasks: &HashMap<String, TaskSpec>) -> Result<(), ConfigError> {
    let mut marks: HashMap<&str, Mark> = tasks
        .keys()
        .map(|name| (name.as_str(), Mark::Unvisited))
        .collect();

    for name in sorted_names(tasks) {
        if marks[name] == Mark::Unvisited {
            visit(tasks, name, &mut marks)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    tasks: &'a HashMap<String, TaskSpec>,
    name: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<(), ConfigError> {
    marks.insert(name, Mark::InProgress);

    for dep in &tasks[name].dependencies {
        match marks.get(dep.as_str()).copied() {
            Some(Mark::Unvisited) => visit(tasks, dep, marks)?,
            Some(Mark::InProgress) => {
                return Err(ConfigError::CircularDependency {
                    from: name.to_string(),
                    to: dep.clone(),
                });
            }
            Some(Mark::Done) => {}
            None => {
                return Err(ConfigError::UnknownDependency {
                    task: name.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    marks.insert(name, Mark::Done);
    Ok(())
}

/// Task names in a stable order so error messages do not depend on hashing
fn sorted_names(tasks: &HashMap<String, TaskSpec>) -> Vec<&str> {
    let mut names: Vec<&str> = tasks.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}
