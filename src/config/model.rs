// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{StalenessMode, StateStorageMode};

/// Top-level build file as read from TOML, before semantic validation.
///
/// ```toml
/// [build]
/// jobs = 4
/// keep_going = false
/// staleness = "fingerprint"
///
/// [task.gen]
/// cmd = "python gen.py"
/// outputs = ["gen/version.h"]
///
/// [task.compile]
/// cmd = "cc -c src/main.c -o main.o"
/// deps = ["gen"]
/// inputs = ["src/**/*.c", "src/**/*.h"]
/// outputs = ["main.o"]
/// ```
///
/// All sections are optional except that at least one task must exist
/// (checked in `validate`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawBuildFile {
    /// Global behaviour config from `[build]`.
    #[serde(default)]
    pub build: BuildSection,

    /// All tasks from `[task.<name>]`.
    ///
    /// Keys are the task names (e.g. `"compile"`, `"link"`).
    #[serde(default)]
    pub task: BTreeMap<String, TaskSection>,
}

/// A build file whose invariants have been checked.
///
/// Construct via `BuildFile::try_from(raw)` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct BuildFile {
    pub build: BuildSection,
    pub task: BTreeMap<String, TaskSection>,
}

impl BuildFile {
    /// Wrap already-validated sections. Only `validate.rs` and tests should
    /// call this.
    pub fn new_unchecked(build: BuildSection, task: BTreeMap<String, TaskSection>) -> Self {
        Self { build, task }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BuildSection {
    /// Maximum number of concurrently running tasks.
    ///
    /// If `None`, the available parallelism of the machine is used.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Keep building independent subgraphs after a failure.
    #[serde(default)]
    pub keep_going: bool,

    /// `"timestamp"` or `"fingerprint"`.
    #[serde(default)]
    pub staleness: StalenessMode,

    /// `"file"` or `"memory"`; where recorded fingerprints live between
    /// invocations.
    #[serde(default)]
    pub state_storage: StateStorageMode,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSection {
    /// The command to execute.
    pub cmd: String,

    /// Names of tasks that must complete before this one runs.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Input files this task reads. Entries may be literal paths or glob
    /// patterns (e.g. `"src/**/*.c"`), relative to the build file's
    /// directory.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Artifacts this task produces, relative to the build file's directory.
    ///
    /// A task with no outputs is treated as always stale and runs on every
    /// invocation it is part of.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Free-form description shown in dry-run output.
    #[serde(default)]
    pub description: Option<String>,
}
