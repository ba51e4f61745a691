// src/stale/evaluate.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::graph::PlannedTask;
use crate::stale::fingerprint::FingerprintCache;
use crate::stale::inputs::{absolute, expand_inputs};
use crate::stale::state::StateStore;
use crate::types::StalenessMode;
use blake3::Hasher;

/// Decides, per task, whether its outputs are out of date and the task must
/// run.
///
/// A task is stale if any of:
/// - it declares no outputs (pure actions always execute),
/// - any declared output is missing,
/// - any prerequisite task actually ran this invocation,
/// - (timestamp mode) the newest input is newer than the oldest output,
/// - (fingerprint mode) the content fingerprint of the inputs differs from
///   the one recorded after the last successful run.
///
/// Evaluation itself has no side effects; [`StalenessEvaluator::record_success`]
/// is the only write path and stores the new input fingerprint.
pub struct StalenessEvaluator {
    mode: StalenessMode,
    fs: Arc<dyn FileSystem>,
    store: Box<dyn StateStore>,
    root: PathBuf,
    cache: FingerprintCache,
}

impl StalenessEvaluator {
    pub fn new(
        mode: StalenessMode,
        fs: Arc<dyn FileSystem>,
        store: Box<dyn StateStore>,
        root: PathBuf,
    ) -> Self {
        Self {
            mode,
            fs,
            store,
            root,
            cache: FingerprintCache::new(),
        }
    }

    pub fn mode(&self) -> StalenessMode {
        self.mode
    }

    /// Whether `task` must run. `deps_reran` reports whether any prerequisite
    /// actually executed (as opposed to being skipped) this invocation.
    pub fn is_stale(&mut self, task: &PlannedTask, deps_reran: bool) -> Result<bool> {
        if task.outputs.is_empty() {
            debug!(task = %task.name, "no declared outputs; always stale");
            return Ok(true);
        }

        let outputs: Vec<PathBuf> = task
            .outputs
            .iter()
            .map(|o| absolute(&self.root, Path::new(o)))
            .collect();

        for output in &outputs {
            if !self.fs.exists(output) {
                debug!(task = %task.name, output = ?output, "output missing; stale");
                return Ok(true);
            }
        }

        if deps_reran {
            debug!(task = %task.name, "a prerequisite ran this invocation; stale");
            return Ok(true);
        }

        let inputs = expand_inputs(self.fs.as_ref(), &self.root, &task.inputs)?;

        match self.mode {
            StalenessMode::Timestamp => self.timestamps_stale(task, &inputs, &outputs),
            StalenessMode::Fingerprint => self.fingerprint_stale(task, &inputs),
        }
    }

    /// Record that `task` ran successfully, storing the fingerprint of its
    /// current inputs for future invocations.
    pub fn record_success(&mut self, task: &PlannedTask) -> Result<()> {
        if task.outputs.is_empty() || self.mode != StalenessMode::Fingerprint {
            return Ok(());
        }
        let inputs = expand_inputs(self.fs.as_ref(), &self.root, &task.inputs)?;
        let fp = self.aggregate_fingerprint(&inputs)?;
        self.store.save(&task.name, &fp)
    }

    fn timestamps_stale(
        &self,
        task: &PlannedTask,
        inputs: &[PathBuf],
        outputs: &[PathBuf],
    ) -> Result<bool> {
        if inputs.is_empty() {
            debug!(task = %task.name, "outputs present, no inputs; up to date");
            return Ok(false);
        }

        let mut oldest_output: Option<SystemTime> = None;
        for output in outputs {
            let mtime = self.fs.modified(output)?;
            oldest_output = Some(match oldest_output {
                Some(t) => t.min(mtime),
                None => mtime,
            });
        }
        let oldest_output = oldest_output.expect("outputs checked non-empty");

        for input in inputs {
            if !self.fs.is_file(input) {
                debug!(task = %task.name, input = ?input, "input missing; stale");
                return Ok(true);
            }
            if self.fs.modified(input)? > oldest_output {
                debug!(task = %task.name, input = ?input, "input newer than outputs; stale");
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn fingerprint_stale(&mut self, task: &PlannedTask, inputs: &[PathBuf]) -> Result<bool> {
        let current = self.aggregate_fingerprint(inputs)?;
        let recorded = self.store.load(&task.name)?;
        let stale = recorded.as_deref() != Some(current.as_str());
        debug!(
            task = %task.name,
            recorded = ?recorded,
            current = %current,
            stale,
            "fingerprint comparison"
        );
        Ok(stale)
    }

    /// Aggregate fingerprint of a sorted input list, using the per-invocation
    /// cache for the individual files.
    fn aggregate_fingerprint(&mut self, inputs: &[PathBuf]) -> Result<String> {
        let mut hasher = Hasher::new();
        for input in inputs {
            if self.fs.is_file(input) {
                let fp = self.cache.get_or_compute(self.fs.as_ref(), input)?;
                hasher.update(fp.as_bytes());
            }
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}
