// src/graph/store.rs

use std::collections::HashMap;

use crate::config::model::BuildFile;
use crate::errors::{BuildError, Result};
use crate::graph::TaskName;

/// A single task definition: a named unit of build work with declared
/// prerequisites, inputs, outputs and an opaque command.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    /// The command to execute; opaque to the engine, interpreted by the
    /// action runner.
    pub command: String,
    /// Names of tasks that must complete before this one runs.
    pub deps: Vec<TaskName>,
    /// Input files, as literal paths or glob patterns relative to the
    /// project root.
    pub inputs: Vec<String>,
    /// Output artifacts, relative to the project root.
    pub outputs: Vec<String>,
    pub description: Option<String>,
}

/// The Task Graph Store: task definitions in declaration order plus a name
/// index. Populated once per invocation and read-only during execution.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a validated [`BuildFile`].
    pub fn from_build_file(build_file: &BuildFile) -> Result<Self> {
        let mut graph = Self::new();
        for (name, section) in build_file.task.iter() {
            graph.add_task(Task {
                name: name.clone(),
                command: section.cmd.clone(),
                deps: section.deps.clone(),
                inputs: section.inputs.clone(),
                outputs: section.outputs.clone(),
                description: section.description.clone(),
            })?;
        }
        Ok(graph)
    }

    /// Register a task. Fails if a task with the same name already exists.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(BuildError::DuplicateTask(task.name));
        }
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Look up a task by name. Fails if no such task is registered.
    pub fn task(&self, name: &str) -> Result<&Task> {
        self.index
            .get(name)
            .map(|&i| &self.tasks[i])
            .ok_or_else(|| BuildError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declaration-order position of a task, if registered.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// All registered tasks, in declaration order. Finite and restartable.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn task_at(&self, idx: usize) -> &Task {
        &self.tasks[idx]
    }
}
