#![allow(dead_code)]

use std::collections::BTreeMap;

use dagmake::config::{BuildFile, BuildSection, RawBuildFile, TaskSection};
use dagmake::types::{StalenessMode, StateStorageMode};

/// Builder for `BuildFile` to simplify test setup.
pub struct BuildFileBuilder {
    raw: RawBuildFile,
}

impl BuildFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawBuildFile {
                build: BuildSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskSection) -> Self {
        self.raw.task.insert(name.to_string(), task);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.raw.build.jobs = Some(jobs);
        self
    }

    pub fn with_keep_going(mut self, val: bool) -> Self {
        self.raw.build.keep_going = val;
        self
    }

    pub fn with_staleness(mut self, mode: StalenessMode) -> Self {
        self.raw.build.staleness = mode;
        self
    }

    pub fn with_state_storage(mut self, mode: StateStorageMode) -> Self {
        self.raw.build.state_storage = mode;
        self
    }

    pub fn build(self) -> BuildFile {
        BuildFile::try_from(self.raw).expect("Failed to build valid build file from builder")
    }

    pub fn build_raw(self) -> RawBuildFile {
        self.raw
    }
}

impl Default for BuildFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSection`.
pub struct TaskBuilder {
    task: TaskSection,
}

impl TaskBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskSection {
                cmd: cmd.to_string(),
                deps: vec![],
                inputs: vec![],
                outputs: vec![],
                description: None,
            },
        }
    }

    pub fn dep(mut self, name: &str) -> Self {
        self.task.deps.push(name.to_string());
        self
    }

    pub fn input(mut self, path: &str) -> Self {
        self.task.inputs.push(path.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.task.outputs.push(path.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    pub fn build(self) -> TaskSection {
        self.task
    }
}
