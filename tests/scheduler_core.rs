// tests/scheduler_core.rs

//! Unit tests driving the pure scheduler core, without Tokio, channels, or
//! processes.

mod common;
use crate::common::builders::{BuildFileBuilder, TaskBuilder};
use crate::common::init_tracing;

use dagmake::exec::ActionOutcome;
use dagmake::graph::{ExecutionPlan, TaskGraph, resolve};
use dagmake::report::{FailureCause, TaskStatus};
use dagmake::sched::core::{Command, CoreStep};
use dagmake::sched::{DispatchedTask, RunOptions, SchedEvent, SchedulerCore, TaskState};

fn chain_plan() -> ExecutionPlan {
    // a -> b -> c
    let build_file = BuildFileBuilder::new()
        .with_task("a", TaskBuilder::new("echo a").build())
        .with_task("b", TaskBuilder::new("echo b").dep("a").build())
        .with_task("c", TaskBuilder::new("echo c").dep("b").build())
        .build();
    let graph = TaskGraph::from_build_file(&build_file).unwrap();
    resolve(&graph, &["c".to_string()]).unwrap()
}

fn diamond_plan() -> ExecutionPlan {
    let build_file = BuildFileBuilder::new()
        .with_task("a", TaskBuilder::new("echo a").build())
        .with_task("b", TaskBuilder::new("echo b").dep("a").build())
        .with_task("c", TaskBuilder::new("echo c").dep("a").build())
        .with_task("d", TaskBuilder::new("echo d").dep("b").dep("c").build())
        .build();
    let graph = TaskGraph::from_build_file(&build_file).unwrap();
    resolve(&graph, &["d".to_string()]).unwrap()
}

fn options(concurrency: usize, keep_going: bool) -> RunOptions {
    RunOptions {
        concurrency,
        keep_going,
    }
}

fn dispatched(step: &CoreStep) -> Vec<DispatchedTask> {
    step.commands
        .iter()
        .flat_map(|c| match c {
            Command::Dispatch(tasks) => tasks.clone(),
        })
        .collect()
}

fn success(task: &str) -> SchedEvent {
    SchedEvent::ActionFinished {
        task: task.to_string(),
        outcome: ActionOutcome::Success {
            output: String::new(),
        },
    }
}

fn failure(task: &str, exit_code: i32) -> SchedEvent {
    SchedEvent::ActionFinished {
        task: task.to_string(),
        outcome: ActionOutcome::Failed {
            exit_code,
            output: "boom".to_string(),
        },
    }
}

#[test]
fn chain_runs_in_order_and_succeeds() {
    init_tracing();

    let plan = chain_plan();
    let mut core = SchedulerCore::new(&plan, options(2, false));

    let step = core.start();
    assert_eq!(
        dispatched(&step).iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec!["a"]
    );
    assert!(!step.finished);

    let step = core.step(success("a"));
    let batch = dispatched(&step);
    assert_eq!(batch[0].name, "b");
    // a actually ran, so b's staleness check must see that.
    assert!(batch[0].deps_reran);

    let step = core.step(success("b"));
    assert_eq!(dispatched(&step)[0].name, "c");

    let step = core.step(success("c"));
    assert!(step.finished);

    let report = core.into_report();
    for name in ["a", "b", "c"] {
        assert!(matches!(
            report.status_of(name),
            Some(TaskStatus::Succeeded { .. })
        ));
    }
    assert!(report.success());
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn failure_fails_all_transitive_dependents_without_running_them() {
    init_tracing();

    let plan = chain_plan();
    let mut core = SchedulerCore::new(&plan, options(2, false));

    let step = core.start();
    assert_eq!(dispatched(&step).len(), 1);

    let step = core.step(failure("a", 2));
    // Nothing further is dispatched and the run is over.
    assert!(dispatched(&step).is_empty());
    assert!(step.finished);

    let report = core.into_report();
    match report.status_of("a") {
        Some(TaskStatus::Failed {
            cause: FailureCause::Action { exit_code, output },
        }) => {
            assert_eq!(*exit_code, 2);
            assert_eq!(output, "boom");
        }
        other => panic!("unexpected status for a: {other:?}"),
    }
    assert!(matches!(
        report.status_of("b"),
        Some(TaskStatus::Failed {
            cause: FailureCause::Prerequisite { dep }
        }) if dep == "a"
    ));
    assert!(matches!(
        report.status_of("c"),
        Some(TaskStatus::Failed {
            cause: FailureCause::Prerequisite { dep }
        }) if dep == "b"
    ));
    assert_ne!(report.exit_code(), 0);
    assert!(!report.is_interrupted());
}

#[test]
fn keep_going_continues_independent_tasks_after_failure() {
    init_tracing();

    // a and b independent, c depends on a.
    let build_file = BuildFileBuilder::new()
        .with_task("a", TaskBuilder::new("echo a").build())
        .with_task("b", TaskBuilder::new("echo b").build())
        .with_task("c", TaskBuilder::new("echo c").dep("a").build())
        .build();
    let graph = TaskGraph::from_build_file(&build_file).unwrap();
    let plan = resolve(
        &graph,
        &["a".to_string(), "b".to_string(), "c".to_string()],
    )
    .unwrap();

    let mut core = SchedulerCore::new(&plan, options(1, true));

    let step = core.start();
    assert_eq!(dispatched(&step)[0].name, "a");

    // a fails; with keep-going on, b is still dispatched.
    let step = core.step(failure("a", 1));
    assert_eq!(dispatched(&step)[0].name, "b");
    assert_eq!(core.state_of("c"), Some(TaskState::Failed));

    let step = core.step(success("b"));
    assert!(step.finished);

    let report = core.into_report();
    assert!(matches!(
        report.status_of("b"),
        Some(TaskStatus::Succeeded { .. })
    ));
    assert!(matches!(
        report.status_of("c"),
        Some(TaskStatus::Failed {
            cause: FailureCause::Prerequisite { dep }
        }) if dep == "a"
    ));
}

#[test]
fn without_keep_going_unrelated_pending_work_is_aborted() {
    init_tracing();

    let build_file = BuildFileBuilder::new()
        .with_task("a", TaskBuilder::new("echo a").build())
        .with_task("b", TaskBuilder::new("echo b").build())
        .build();
    let graph = TaskGraph::from_build_file(&build_file).unwrap();
    let plan = resolve(&graph, &["a".to_string(), "b".to_string()]).unwrap();

    let mut core = SchedulerCore::new(&plan, options(1, false));

    let step = core.start();
    assert_eq!(dispatched(&step)[0].name, "a");

    let step = core.step(failure("a", 1));
    assert!(step.finished);

    let report = core.into_report();
    assert!(matches!(report.status_of("b"), Some(TaskStatus::Aborted)));
}

#[test]
fn diamond_respects_concurrency_and_join() {
    init_tracing();

    let plan = diamond_plan();
    let mut core = SchedulerCore::new(&plan, options(2, false));

    let step = core.start();
    assert_eq!(dispatched(&step)[0].name, "a");
    assert_eq!(core.running_count(), 1);

    // Both b and c become ready; with two slots both run at once.
    let step = core.step(success("a"));
    let batch = dispatched(&step);
    let names: Vec<&str> = batch.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);
    assert_eq!(core.running_count(), 2);

    // d must wait for both.
    let step = core.step(success("b"));
    assert!(dispatched(&step).is_empty());
    assert_eq!(core.state_of("d"), Some(TaskState::Pending));

    let step = core.step(success("c"));
    assert_eq!(dispatched(&step)[0].name, "d");

    let step = core.step(success("d"));
    assert!(step.finished);
    assert!(core.report().success());
}

#[test]
fn concurrency_bound_is_never_exceeded() {
    init_tracing();

    let build_file = BuildFileBuilder::new()
        .with_task("t0", TaskBuilder::new("echo 0").build())
        .with_task("t1", TaskBuilder::new("echo 1").build())
        .with_task("t2", TaskBuilder::new("echo 2").build())
        .with_task("t3", TaskBuilder::new("echo 3").build())
        .build();
    let graph = TaskGraph::from_build_file(&build_file).unwrap();
    let targets: Vec<String> = graph.tasks().map(|t| t.name.clone()).collect();
    let plan = resolve(&graph, &targets).unwrap();

    let mut core = SchedulerCore::new(&plan, options(2, false));

    let step = core.start();
    let mut in_flight = dispatched(&step);
    assert_eq!(in_flight.len(), 2);
    assert_eq!(core.running_count(), 2);

    let mut finished = step.finished;
    while !finished {
        assert!(core.running_count() <= 2);
        let next = in_flight.remove(0);
        let step = core.step(success(&next.name));
        in_flight.extend(dispatched(&step));
        assert!(core.running_count() <= 2);
        finished = step.finished;
    }

    assert_eq!(core.report().count(|s| matches!(s, TaskStatus::Succeeded { .. })), 4);
}

#[test]
fn up_to_date_task_is_skipped_and_satisfies_dependents() {
    init_tracing();

    let plan = chain_plan();
    let mut core = SchedulerCore::new(&plan, options(1, false));

    core.start();
    let step = core.step(SchedEvent::TaskUpToDate {
        task: "a".to_string(),
    });
    assert_eq!(core.state_of("a"), Some(TaskState::Skipped));

    // b runs, but its prerequisite did not actually re-run.
    let batch = dispatched(&step);
    assert_eq!(batch[0].name, "b");
    assert!(!batch[0].deps_reran);
}

#[test]
fn abort_marks_pending_tasks_and_lets_running_finish() {
    init_tracing();

    let plan = chain_plan();
    let mut core = SchedulerCore::new(&plan, options(1, false));

    let step = core.start();
    assert_eq!(dispatched(&step)[0].name, "a");

    // Abort arrives while a is running.
    let step = core.step(SchedEvent::AbortRequested);
    assert!(!step.finished, "running task must be allowed to finish");
    assert_eq!(core.state_of("b"), Some(TaskState::Aborted));
    assert_eq!(core.state_of("c"), Some(TaskState::Aborted));

    // A second abort signal is a no-op.
    let step = core.step(SchedEvent::AbortRequested);
    assert!(!step.finished);

    // a finishes normally; nothing new starts and the run ends.
    let step = core.step(success("a"));
    assert!(step.finished);

    let report = core.into_report();
    assert!(matches!(
        report.status_of("a"),
        Some(TaskStatus::Succeeded { .. })
    ));
    assert!(matches!(report.status_of("b"), Some(TaskStatus::Aborted)));
    assert!(matches!(report.status_of("c"), Some(TaskStatus::Aborted)));
    assert!(report.is_interrupted());
    assert_eq!(report.exit_code(), 130);
}
