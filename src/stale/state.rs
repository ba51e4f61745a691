// src/stale/state.rs

//! Persisted staleness state: task name -> last recorded input fingerprint.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::graph::TaskName;

/// Relative path (from the project root) to the state file.
///
/// The effective path on disk is `<root>/.dagmake/state` where `<root>` is
/// the directory containing the build file.
pub const STATE_FILE_PATH: &str = ".dagmake/state";

fn state_file_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE_PATH)
}

/// Abstract storage for recorded task fingerprints.
pub trait StateStore: Send {
    fn load(&self, task: &str) -> Result<Option<String>>;
    fn save(&mut self, task: &str, fingerprint: &str) -> Result<()>;
    /// Remove records for tasks that are not in the `active_tasks` list.
    fn prune(&mut self, active_tasks: &[&str]) -> Result<()>;
}

/// Stores fingerprints in a file (`.dagmake/state`).
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl StateStore for FileStateStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        let map = load_all_records(&self.root)?;
        Ok(map.get(task).cloned())
    }

    fn save(&mut self, task: &str, fingerprint: &str) -> Result<()> {
        let mut map = load_all_records(&self.root)?;
        map.insert(task.to_string(), fingerprint.to_string());
        save_all_records(&self.root, &map)?;
        debug!(task = %task, fingerprint = %fingerprint, "recorded task fingerprint (file)");
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let mut map = load_all_records(&self.root)?;
        let initial_len = map.len();
        map.retain(|k, _| active_tasks.contains(&k.as_str()));

        if map.len() < initial_len {
            save_all_records(&self.root, &map)?;
            info!(
                removed = initial_len - map.len(),
                "pruned records of removed tasks (file)"
            );
        }
        Ok(())
    }
}

/// Stores fingerprints in memory only.
#[derive(Default)]
pub struct MemoryStateStore {
    map: HashMap<String, String>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        Ok(self.map.get(task).cloned())
    }

    fn save(&mut self, task: &str, fingerprint: &str) -> Result<()> {
        self.map.insert(task.to_string(), fingerprint.to_string());
        debug!(task = %task, fingerprint = %fingerprint, "recorded task fingerprint (memory)");
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let initial_len = self.map.len();
        self.map.retain(|k, _| active_tasks.contains(&k.as_str()));
        if self.map.len() < initial_len {
            info!(
                removed = initial_len - self.map.len(),
                "pruned records of removed tasks (memory)"
            );
        }
        Ok(())
    }
}

/// Load all recorded fingerprints from `<root>/.dagmake/state`.
fn load_all_records(root: &Path) -> Result<HashMap<TaskName, String>> {
    let path = state_file_path(root);

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(&path).with_context(|| format!("opening state file at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();

    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((name, fp)) = trimmed.split_once(char::is_whitespace) {
            map.insert(name.to_string(), fp.trim().to_string());
        }
    }

    Ok(map)
}

/// Persist all recorded fingerprints to `<root>/.dagmake/state`.
fn save_all_records(root: &Path, map: &HashMap<TaskName, String>) -> Result<()> {
    let path = state_file_path(root);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory at {:?}", parent))?;
    }

    let file = File::create(&path).with_context(|| format!("creating state file at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for (name, fp) in map.iter() {
        writeln!(writer, "{} {}", name, fp)?;
    }

    writer.flush()?;
    Ok(())
}
