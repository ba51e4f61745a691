// tests/staleness.rs

mod common;
use crate::common::init_tracing;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use dagmake::fs::mock::MockFileSystem;
use dagmake::graph::PlannedTask;
use dagmake::stale::{MemoryStateStore, StalenessEvaluator, StateStore, expand_inputs};
use dagmake::types::StalenessMode;

/// A state store tests can share across evaluator instances, mimicking
/// persistence between invocations.
#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<MemoryStateStore>>);

impl StateStore for SharedStore {
    fn load(&self, task: &str) -> Result<Option<String>> {
        self.0.lock().unwrap().load(task)
    }

    fn save(&mut self, task: &str, fingerprint: &str) -> Result<()> {
        self.0.lock().unwrap().save(task, fingerprint)
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        self.0.lock().unwrap().prune(active_tasks)
    }
}

fn planned(name: &str, inputs: &[&str], outputs: &[&str]) -> PlannedTask {
    PlannedTask {
        name: name.to_string(),
        command: format!("echo {name}"),
        deps: vec![],
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
        description: None,
    }
}

fn evaluator(mode: StalenessMode, fs: &MockFileSystem, store: SharedStore) -> StalenessEvaluator {
    StalenessEvaluator::new(
        mode,
        Arc::new(fs.clone()),
        Box::new(store),
        PathBuf::from("/proj"),
    )
}

#[test]
fn task_without_outputs_is_always_stale() {
    init_tracing();

    let fs = MockFileSystem::new();
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("check", &[], &[]);
    assert!(eval.is_stale(&task, false).unwrap());
}

#[test]
fn missing_output_is_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.c", "int main() {}", 100);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("compile", &["src/main.c"], &["main.o"]);
    assert!(eval.is_stale(&task, false).unwrap());
}

#[test]
fn output_newer_than_inputs_is_up_to_date() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.c", "int main() {}", 100);
    fs.add_file("/proj/main.o", "obj", 200);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("compile", &["src/main.c"], &["main.o"]);
    assert!(!eval.is_stale(&task, false).unwrap());
}

#[test]
fn input_newer_than_output_is_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.c", "int main() {}", 300);
    fs.add_file("/proj/main.o", "obj", 200);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("compile", &["src/main.c"], &["main.o"]);
    assert!(eval.is_stale(&task, false).unwrap());
}

#[test]
fn oldest_output_decides_timestamp_comparison() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/in.txt", "x", 150);
    fs.add_file("/proj/out_new.txt", "y", 200);
    fs.add_file("/proj/out_old.txt", "z", 100);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("gen", &["in.txt"], &["out_new.txt", "out_old.txt"]);
    assert!(eval.is_stale(&task, false).unwrap());
}

#[test]
fn missing_literal_input_is_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/main.o", "obj", 200);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("compile", &["src/gone.c"], &["main.o"]);
    assert!(eval.is_stale(&task, false).unwrap());
}

#[test]
fn rerun_prerequisite_makes_dependent_stale() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.c", "int main() {}", 100);
    fs.add_file("/proj/main.o", "obj", 200);
    let mut eval = evaluator(StalenessMode::Timestamp, &fs, SharedStore::default());

    let task = planned("compile", &["src/main.c"], &["main.o"]);
    assert!(!eval.is_stale(&task, false).unwrap());
    assert!(eval.is_stale(&task, true).unwrap());
}

#[test]
fn fingerprint_mode_tracks_content_changes_across_invocations() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/lib.rs", "fn lib() {}", 100);
    fs.add_file("/proj/lib.a", "archive", 50);
    let store = SharedStore::default();

    // First invocation: nothing recorded yet.
    let mut eval = evaluator(StalenessMode::Fingerprint, &fs, store.clone());
    let task = planned("archive", &["src/lib.rs"], &["lib.a"]);
    assert!(eval.is_stale(&task, false).unwrap());
    eval.record_success(&task).unwrap();
    assert!(!eval.is_stale(&task, false).unwrap());

    // Second invocation, content unchanged: up to date even though the
    // output is older than the input (timestamps are irrelevant here).
    let mut eval = evaluator(StalenessMode::Fingerprint, &fs, store.clone());
    assert!(!eval.is_stale(&task, false).unwrap());

    // Content changes: stale again.
    fs.add_file("/proj/src/lib.rs", "fn lib() { changed() }", 100);
    let mut eval = evaluator(StalenessMode::Fingerprint, &fs, store.clone());
    assert!(eval.is_stale(&task, false).unwrap());

    // Reverting the content restores freshness.
    fs.add_file("/proj/src/lib.rs", "fn lib() {}", 100);
    let mut eval = evaluator(StalenessMode::Fingerprint, &fs, store);
    assert!(!eval.is_stale(&task, false).unwrap());
}

#[test]
fn glob_inputs_expand_to_matching_files_only() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/a.c", "a", 1);
    fs.add_file("/proj/src/sub/b.c", "b", 1);
    fs.add_file("/proj/src/notes.md", "n", 1);
    fs.add_file("/proj/README", "r", 1);

    let files = expand_inputs(&fs, &PathBuf::from("/proj"), &["src/**/*.c".to_string()]).unwrap();

    assert_eq!(
        files,
        vec![PathBuf::from("/proj/src/a.c"), PathBuf::from("/proj/src/sub/b.c")]
    );
}

#[test]
fn literal_and_glob_inputs_combine_without_duplicates() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/a.c", "a", 1);
    fs.add_file("/proj/Makefile.in", "m", 1);

    let files = expand_inputs(
        &fs,
        &PathBuf::from("/proj"),
        &[
            "Makefile.in".to_string(),
            "src/*.c".to_string(),
            "src/a.c".to_string(),
        ],
    )
    .unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("/proj/Makefile.in"),
            PathBuf::from("/proj/src/a.c"),
        ]
    );
}
