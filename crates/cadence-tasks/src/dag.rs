//! Execution planning over a validated task configuration

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use tracing::{info, instrument};

use cadence_core::config::{TaskSpec, TasksCfg};
use cadence_core::error::ConfigError;

/// A task spec placed in the execution DAG
#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    /// Task spec name
    pub name: String,
    /// The task spec
    pub spec: TaskSpec,
    /// Task specs that must complete before this one
    pub dependencies: BTreeSet<String>,
    /// Task specs waiting on this one
    pub dependents: BTreeSet<String>,
    /// Execution wave (task specs in the same wave can run in parallel)
    pub wave: usize,
}

/// Directed acyclic graph of task specs
#[derive(Debug, Clone)]
pub struct TaskDag {
    nodes: BTreeMap<String, TaskNode>,
    /// Wave 0 runs first, then wave 1, and so on
    waves: Vec<Vec<String>>,
    sorted_order: Vec<String>,
}

impl TaskDag {
    /// Build the DAG of every task spec in `cfg`.
    ///
    /// The configuration is validated first, so a config with unknown
    /// dependencies or cycles is rejected as a whole.
    #[instrument(skip_all, fields(tasks = cfg.tasks.len()))]
    pub fn build(cfg: &TasksCfg) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Self::from_specs(cfg.tasks.iter())
    }

    /// Build the DAG for one job: its task specs and everything they
    /// transitively depend on
    #[instrument(skip(cfg), fields(tasks = cfg.tasks.len()))]
    pub fn for_job(cfg: &TasksCfg, job: &str) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let job_spec = cfg.job(job).ok_or_else(|| ConfigError::InvalidValue {
            field: "job".to_string(),
            message: format!("unknown job '{}'", job),
        })?;

        let mut selected: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = job_spec.task_specs.iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if !selected.insert(name) {
                continue;
            }
            if let Some(spec) = cfg.task(name) {
                stack.extend(spec.dependencies.iter().map(String::as_str));
            }
        }

        Self::from_specs(
            cfg.tasks
                .iter()
                .filter(|(name, _)| selected.contains(name.as_str())),
        )
    }

    fn from_specs<'a>(
        specs: impl Iterator<Item = (&'a String, &'a TaskSpec)>,
    ) -> Result<Self, ConfigError> {
        let mut nodes: BTreeMap<String, TaskNode> = specs
            .map(|(name, spec)| {
                let node = TaskNode {
                    name: name.clone(),
                    spec: spec.clone(),
                    dependencies: spec.dependencies.iter().cloned().collect(),
                    dependents: BTreeSet::new(),
                    wave: 0,
                };
                (name.clone(), node)
            })
            .collect();

        let edges: Vec<(String, String)> = nodes
            .values()
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .map(move |dep| (dep.clone(), node.name.clone()))
            })
            .collect();
        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.insert(dependent);
            }
        }

        let sorted_order = Self::topological_sort(&nodes)?;
        let waves = Self::compute_waves(&nodes, &sorted_order);

        for (wave_idx, wave) in waves.iter().enumerate() {
            for name in wave {
                if let Some(node) = nodes.get_mut(name) {
                    node.wave = wave_idx;
                }
            }
        }

        info!(
            task_count = nodes.len(),
            wave_count = waves.len(),
            "task DAG built"
        );

        Ok(Self {
            nodes,
            waves,
            sorted_order,
        })
    }

    /// Topological sort using Kahn's algorithm
    fn topological_sort(nodes: &BTreeMap<String, TaskNode>) -> Result<Vec<String>, ConfigError> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut sorted: Vec<String> = Vec::with_capacity(nodes.len());

        for (name, node) in nodes {
            let degree = node
                .dependencies
                .iter()
                .filter(|d| nodes.contains_key(*d))
                .count();
            in_degree.insert(name, degree);
            if degree == 0 {
                queue.push_back(name);
            }
        }

        while let Some(name) = queue.pop_front() {
            sorted.push(name.to_string());

            if let Some(node) = nodes.get(name) {
                for dependent in &node.dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if sorted.len() != nodes.len() {
            // Validation rejects cycles, so this only guards direct callers.
            let stuck = nodes
                .values()
                .find(|node| in_degree.get(node.name.as_str()).copied().unwrap_or(0) > 0);
            if let Some(node) = stuck {
                let to = node
                    .dependencies
                    .iter()
                    .find(|dep| in_degree.get(dep.as_str()).copied().unwrap_or(0) > 0)
                    .cloned()
                    .unwrap_or_else(|| node.name.clone());
                return Err(ConfigError::CircularDependency {
                    from: node.name.clone(),
                    to,
                });
            }
        }

        Ok(sorted)
    }

    /// Compute execution waves (groups of task specs that can run in parallel)
    fn compute_waves(nodes: &BTreeMap<String, TaskNode>, sorted: &[String]) -> Vec<Vec<String>> {
        if sorted.is_empty() {
            return Vec::new();
        }

        let mut wave_map: HashMap<&str, usize> = HashMap::new();
        for name in sorted {
            if let Some(node) = nodes.get(name) {
                let wave = node
                    .dependencies
                    .iter()
                    .filter_map(|dep| wave_map.get(dep.as_str()))
                    .max()
                    .map(|w| w + 1)
                    .unwrap_or(0);
                wave_map.insert(name, wave);
            }
        }

        let max_wave = wave_map.values().max().copied().unwrap_or(0);
        let mut waves: Vec<Vec<String>> = vec![Vec::new(); max_wave + 1];
        for name in sorted {
            if let Some(&wave) = wave_map.get(name.as_str()) {
                waves[wave].push(name.clone());
            }
        }
        for wave in &mut waves {
            wave.sort();
        }

        waves
    }

    /// All task nodes, by name
    pub fn nodes(&self) -> &BTreeMap<String, TaskNode> {
        &self.nodes
    }

    /// Get a specific task node
    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    /// Execution waves
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topologically sorted order
    pub fn sorted(&self) -> &[String] {
        &self.sorted_order
    }

    /// Human-readable summary of the execution plan
    pub fn execution_plan(&self) -> String {
        let mut plan = String::new();
        for (i, wave) in self.waves.iter().enumerate() {
            plan.push_str(&format!("Wave {} ({} tasks):\n", i, wave.len()));
            for name in wave {
                if let Some(node) = self.nodes.get(name) {
                    let run = describe_run(&node.spec);
                    if node.dependencies.is_empty() {
                        plan.push_str(&format!("  {} -> {}\n", name, run));
                    } else {
                        let deps: Vec<&str> =
                            node.dependencies.iter().map(String::as_str).collect();
                        plan.push_str(&format!(
                            "  {} -> {} (after: {})\n",
                            name,
                            run,
                            deps.join(", ")
                        ));
                    }
                }
            }
        }
        plan
    }
}

fn describe_run(spec: &TaskSpec) -> String {
    match (&spec.isolate, spec.command.is_empty()) {
        (Some(isolate), _) => format!("isolate {}", isolate),
        (None, false) => spec.command.join(" "),
        (None, true) => "<no command>".to_string(),
    }
}
