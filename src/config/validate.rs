// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{BuildFile, RawBuildFile};
use crate::errors::{BuildError, Result};

impl TryFrom<RawBuildFile> for BuildFile {
    type Error = BuildError;

    fn try_from(raw: RawBuildFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_build_file(&raw)?;
        Ok(BuildFile::new_unchecked(raw.build, raw.task))
    }
}

fn validate_raw_build_file(raw: &RawBuildFile) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_build_section(raw)?;
    validate_task_dependencies(raw)?;
    validate_acyclic(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawBuildFile) -> Result<()> {
    if raw.task.is_empty() {
        return Err(BuildError::ConfigError(
            "build file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_build_section(raw: &RawBuildFile) -> Result<()> {
    if raw.build.jobs == Some(0) {
        return Err(BuildError::ConfigError(
            "[build].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(raw: &RawBuildFile) -> Result<()> {
    for (name, task) in raw.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(BuildError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        for dep in task.deps.iter() {
            if !raw.task.contains_key(dep) {
                return Err(BuildError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `deps`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(BuildError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `deps`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_acyclic(raw: &RawBuildFile) -> Result<()> {
    // Edge direction: dep -> task. For:
    //   [task.link]
    //   deps = ["compile"]
    // we add edge compile -> link.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in raw.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in raw.task.iter() {
        for dep in task.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort fails iff there is a cycle. The resolver reports
    // full cycle membership later; here we reject early with the task that
    // petgraph flagged.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(BuildError::DependencyCycle(vec![node.to_string()]))
        }
    }
}
