// src/graph/resolve.rs

//! Dependency resolution: requested targets -> execution plan.

use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::graph::store::TaskGraph;
use crate::graph::TaskName;

/// A task as it appears in an execution plan.
///
/// `deps` only contains tasks that are themselves part of the plan; the
/// resolver includes the full prerequisite closure, so this is every declared
/// dependency.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub name: TaskName,
    pub command: String,
    pub deps: Vec<TaskName>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub description: Option<String>,
}

/// Topologically ordered set of tasks required to satisfy the requested
/// targets. Immutable once computed for a given invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    tasks: Vec<PlannedTask>,
}

impl ExecutionPlan {
    /// Tasks in execution order: every prerequisite precedes its dependents.
    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Plan-order position of a task, if present.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }
}

/// Per-task visitation state for the depth-first traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// Not reached yet.
    New,
    /// On the current traversal path; revisiting means a cycle.
    Active,
    /// Fully processed and emitted into the plan.
    Done,
}

/// Compute the transitive prerequisite closure of `targets` and a valid
/// execution order.
///
/// - Fails with [`BuildError::UnknownTask`] if a requested target or any
///   declared prerequisite is not registered in the store.
/// - Fails with [`BuildError::DependencyCycle`] if a task is reachable from
///   itself; the error carries the cycle's member names in traversal order.
/// - On success, the plan is a deterministic topological ordering: targets
///   are visited in request order and prerequisites in declaration order, so
///   repeated invocations produce identical plans.
pub fn resolve(graph: &TaskGraph, targets: &[TaskName]) -> Result<ExecutionPlan> {
    let mut visit = vec![Visit::New; graph.len()];
    let mut order: Vec<usize> = Vec::new();
    // Tasks on the current traversal path, for cycle reporting.
    let mut path: Vec<usize> = Vec::new();
    // (task index, position of the next dependency to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for target in targets {
        let root = graph
            .index_of(target)
            .ok_or_else(|| BuildError::UnknownTask(target.clone()))?;

        if visit[root] == Visit::Done {
            continue;
        }

        visit[root] = Visit::Active;
        path.push(root);
        stack.push((root, 0));

        while let Some(&(node, dep_pos)) = stack.last() {
            let deps = &graph.task_at(node).deps;

            if dep_pos < deps.len() {
                stack.last_mut().unwrap().1 += 1;

                let dep_name = &deps[dep_pos];
                let dep = graph
                    .index_of(dep_name)
                    .ok_or_else(|| BuildError::UnknownTask(dep_name.clone()))?;

                match visit[dep] {
                    Visit::Done => {}
                    Visit::Active => {
                        // Back edge: the cycle is the path suffix starting at
                        // the revisited task.
                        let start = path
                            .iter()
                            .position(|&p| p == dep)
                            .expect("active task must be on the path");
                        let members = path[start..]
                            .iter()
                            .map(|&p| graph.task_at(p).name.clone())
                            .collect();
                        return Err(BuildError::DependencyCycle(members));
                    }
                    Visit::New => {
                        visit[dep] = Visit::Active;
                        path.push(dep);
                        stack.push((dep, 0));
                    }
                }
            } else {
                // All prerequisites emitted; emit this task.
                visit[node] = Visit::Done;
                path.pop();
                stack.pop();
                order.push(node);
            }
        }
    }

    let tasks: Vec<PlannedTask> = order
        .into_iter()
        .map(|i| {
            let task = graph.task_at(i);
            PlannedTask {
                name: task.name.clone(),
                command: task.command.clone(),
                deps: task.deps.clone(),
                inputs: task.inputs.clone(),
                outputs: task.outputs.clone(),
                description: task.description.clone(),
            }
        })
        .collect();

    debug!(
        targets = ?targets,
        plan_len = tasks.len(),
        "resolved execution plan"
    );

    Ok(ExecutionPlan { tasks })
}
