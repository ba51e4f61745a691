// src/lib.rs

pub mod cancel;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod report;
pub mod sched;
pub mod stale;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::BuildFile;
use crate::exec::ShellRunner;
use crate::fs::RealFileSystem;
use crate::graph::{ExecutionPlan, TaskGraph, TaskName, resolve};
use crate::report::BuildReport;
use crate::sched::{BuildRuntime, RunOptions, SchedulerCore};
use crate::stale::{FileStateStore, MemoryStateStore, StalenessEvaluator, StateStore};
use crate::types::{StalenessMode, StateStorageMode};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - build file loading and validation
/// - task graph + dependency resolution
/// - staleness evaluator + persisted state
/// - scheduler core / runtime / shell runner
/// - Ctrl-C handling via the cancellation token
pub async fn run(args: CliArgs) -> Result<BuildReport> {
    let build_file_path = PathBuf::from(&args.file);
    let build_file = load_and_validate(&build_file_path)?;
    let root = project_root_dir(&build_file_path);

    let graph = TaskGraph::from_build_file(&build_file)?;

    let targets: Vec<TaskName> = if args.targets.is_empty() {
        graph.tasks().map(|t| t.name.clone()).collect()
    } else {
        args.targets.clone()
    };

    let plan = resolve(&graph, &targets)?;
    info!(targets = ?targets, tasks = plan.len(), "execution plan resolved");

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(BuildReport::new());
    }

    let options = RunOptions {
        concurrency: effective_jobs(&args, &build_file),
        keep_going: args.keep_going || build_file.build.keep_going,
    };
    let mode = if args.fingerprint {
        StalenessMode::Fingerprint
    } else {
        build_file.build.staleness
    };

    let mut store = make_state_store(build_file.build.state_storage, &root);
    let known: Vec<&str> = graph.tasks().map(|t| t.name.as_str()).collect();
    store.prune(&known)?;

    let evaluator = StalenessEvaluator::new(mode, Arc::new(RealFileSystem), store, root.clone());

    // Ctrl-C -> cooperative abort.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let core = SchedulerCore::new(&plan, options);
    let runner = ShellRunner::new(root);
    let runtime = BuildRuntime::new(core, plan, evaluator, runner, cancel);

    let report = runtime.run().await?;
    Ok(report)
}

/// Figure out the project root for resolving inputs, outputs and state.
///
/// - If the build file path has a non-empty parent (e.g.
///   "configs/Dagmake.toml"), we use that directory.
/// - If it's just a bare filename like "Dagmake.toml" (parent = ""),
///   we fall back to the current working directory "."
fn project_root_dir(build_file_path: &Path) -> PathBuf {
    match build_file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn effective_jobs(args: &CliArgs, build_file: &BuildFile) -> usize {
    args.jobs
        .or(build_file.build.jobs)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

fn make_state_store(mode: StateStorageMode, root: &Path) -> Box<dyn StateStore> {
    match mode {
        StateStorageMode::File => Box::new(FileStateStore::new(root.to_path_buf())),
        StateStorageMode::Memory => Box::new(MemoryStateStore::new()),
    }
}

/// Simple dry-run output: print the plan in execution order.
fn print_dry_run(plan: &ExecutionPlan) {
    println!("dagmake dry-run ({} tasks)", plan.len());
    for (i, task) in plan.tasks().iter().enumerate() {
        println!("  {i:>3}. {}", task.name);
        println!("       cmd: {}", task.command);
        if !task.deps.is_empty() {
            println!("       deps: {:?}", task.deps);
        }
        if let Some(ref description) = task.description {
            println!("       {description}");
        }
    }
    debug!("dry-run complete (no execution)");
}
