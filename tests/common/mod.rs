#![allow(dead_code)]

pub use dagmake_test_utils::builders;
pub use dagmake_test_utils::fake_runner;
pub use dagmake_test_utils::{init_tracing, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use dagmake::cancel::CancelToken;
use dagmake::config::BuildFile;
use dagmake::errors::Result;
use dagmake::exec::ActionRunner;
use dagmake::fs::mock::MockFileSystem;
use dagmake::graph::{TaskGraph, resolve};
use dagmake::report::BuildReport;
use dagmake::sched::{BuildRuntime, RunOptions, SchedulerCore};
use dagmake::stale::{MemoryStateStore, StalenessEvaluator};
use dagmake::types::StalenessMode;

/// Run a build file end to end against the given runner, with a mock
/// filesystem (so tasks without declared outputs are always stale) and an
/// in-memory state store.
pub async fn run_build(
    build_file: &BuildFile,
    targets: &[&str],
    runner: impl ActionRunner + 'static,
    options: RunOptions,
) -> Result<BuildReport> {
    run_build_with_cancel(build_file, targets, runner, options, CancelToken::new()).await
}

/// Like [`run_build`], but with a caller-owned cancellation token so tests
/// can signal an abort mid-run.
pub async fn run_build_with_cancel(
    build_file: &BuildFile,
    targets: &[&str],
    runner: impl ActionRunner + 'static,
    options: RunOptions,
    cancel: CancelToken,
) -> Result<BuildReport> {
    let graph = TaskGraph::from_build_file(build_file)?;
    let targets: Vec<String> = if targets.is_empty() {
        graph.tasks().map(|t| t.name.clone()).collect()
    } else {
        targets.iter().map(|s| s.to_string()).collect()
    };
    let plan = resolve(&graph, &targets)?;

    let evaluator = StalenessEvaluator::new(
        StalenessMode::Timestamp,
        Arc::new(MockFileSystem::new()),
        Box::new(MemoryStateStore::new()),
        PathBuf::from("/proj"),
    );

    let core = SchedulerCore::new(&plan, options);
    let runtime = BuildRuntime::new(core, plan, evaluator, runner, cancel);
    runtime.run().await
}
