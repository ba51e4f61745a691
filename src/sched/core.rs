// src/sched/core.rs

//! Pure scheduler core.
//!
//! A synchronous, deterministic state machine that consumes [`SchedEvent`]s
//! and produces:
//! - updated per-task states
//! - a list of commands describing what the I/O shell should dispatch next
//!
//! The async shell ([`crate::sched::BuildRuntime`]) is responsible for
//! reading events from channels, evaluating staleness, and handing actions
//! to the runner. The core has no channels, no Tokio types, and performs no
//! I/O, so every scheduling rule is unit-testable without processes or a
//! filesystem.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use crate::exec::ActionOutcome;
use crate::graph::{ExecutionPlan, TaskName};
use crate::report::{BuildReport, FailureCause, TaskStatus};
use crate::sched::{DispatchedTask, SchedEvent};

/// Per-task scheduling state.
///
/// `Pending -> Ready -> Running -> {Succeeded, Failed}`, with `Skipped`
/// taken instead of a real run when the task is up to date, and `Aborted`
/// for tasks that cancellation (or stop-on-failure) reached before they ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for prerequisites to finish.
    Pending,
    /// All prerequisites satisfied; waiting for a dispatch slot.
    Ready,
    /// Dispatched to the shell; action running or staleness being decided.
    Running,
    /// Action ran and succeeded.
    Succeeded,
    /// Action failed, or a prerequisite did.
    Failed,
    /// Outputs were up to date; action never invoked.
    Skipped,
    /// Never started: cancellation or stop-on-failure got there first.
    Aborted,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Ready | TaskState::Running)
    }
}

/// Options governing one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Maximum number of concurrently running actions. Clamped to >= 1.
    pub concurrency: usize,
    /// Keep building independent subgraphs after a failure.
    pub keep_going: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            keep_going: false,
        }
    }
}

/// Command produced by the core, to be executed by the I/O shell.
#[derive(Debug, Clone)]
pub enum Command {
    /// Evaluate staleness for these tasks and run the stale ones.
    Dispatch(Vec<DispatchedTask>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<Command>,
    /// Whether the run is complete and the report final.
    pub finished: bool,
}

#[derive(Debug)]
struct TaskEntry {
    name: TaskName,
    command: String,
    /// Plan indices of direct prerequisites.
    deps: Vec<usize>,
    /// Plan indices of direct dependents.
    dependents: Vec<usize>,
    /// Prerequisites not yet succeeded or skipped.
    remaining_deps: usize,
    state: TaskState,
}

/// The scheduler core: immutable plan topology plus mutable per-run state
/// and the build report (single mutable owner during the run).
#[derive(Debug)]
pub struct SchedulerCore {
    entries: Vec<TaskEntry>,
    index: HashMap<TaskName, usize>,
    /// Ready tasks by plan index; dispatch order is ascending, which keeps
    /// the outcome deterministic among simultaneously-ready tasks.
    ready: BTreeSet<usize>,
    running: usize,
    options: RunOptions,
    /// A failure occurred and keep-going is off: no new dispatches.
    halted: bool,
    /// Cancellation was signalled: no new dispatches.
    aborted: bool,
    report: BuildReport,
}

impl SchedulerCore {
    pub fn new(plan: &ExecutionPlan, mut options: RunOptions) -> Self {
        options.concurrency = options.concurrency.max(1);

        let mut index = HashMap::new();
        for (i, task) in plan.tasks().iter().enumerate() {
            index.insert(task.name.clone(), i);
        }

        let mut entries: Vec<TaskEntry> = plan
            .tasks()
            .iter()
            .map(|task| {
                let deps: Vec<usize> = task
                    .deps
                    .iter()
                    .map(|d| *index.get(d).expect("plan contains its own prerequisites"))
                    .collect();
                TaskEntry {
                    name: task.name.clone(),
                    command: task.command.clone(),
                    remaining_deps: deps.len(),
                    deps,
                    dependents: Vec::new(),
                    state: TaskState::Pending,
                }
            })
            .collect();

        for i in 0..entries.len() {
            let deps = entries[i].deps.clone();
            for d in deps {
                entries[d].dependents.push(i);
            }
        }

        Self {
            entries,
            index,
            ready: BTreeSet::new(),
            running: 0,
            options,
            halted: false,
            aborted: false,
            report: BuildReport::new(),
        }
    }

    /// Begin the run: mark tasks without prerequisites ready and dispatch the
    /// first batch.
    pub fn start(&mut self) -> CoreStep {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.remaining_deps == 0 {
                entry.state = TaskState::Ready;
                self.ready.insert(i);
            }
        }
        debug!(tasks = self.entries.len(), "scheduler run started");

        let commands = self.dispatch();
        self.finish_step(commands)
    }

    /// Handle a single event, updating state and returning the resulting
    /// commands for the shell.
    pub fn step(&mut self, event: SchedEvent) -> CoreStep {
        match event {
            SchedEvent::TaskUpToDate { task } => self.handle_up_to_date(&task),
            SchedEvent::ActionFinished { task, outcome } => self.handle_finished(&task, outcome),
            SchedEvent::AbortRequested => self.handle_abort(),
        }

        let commands = self.dispatch();
        self.finish_step(commands)
    }

    /// Read-only view of a task's state, for tests and diagnostics.
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.index.get(task).map(|&i| self.entries[i].state)
    }

    /// Number of tasks currently in `Running`.
    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn into_report(self) -> BuildReport {
        self.report
    }

    fn handle_up_to_date(&mut self, task: &str) {
        let Some(idx) = self.running_index(task) else {
            return;
        };
        self.running -= 1;
        self.entries[idx].state = TaskState::Skipped;
        info!(task = %task, "outputs up to date; skipping");
        self.report.record(task, TaskStatus::Skipped);
        self.on_prerequisite_satisfied(idx);
    }

    fn handle_finished(&mut self, task: &str, outcome: ActionOutcome) {
        let Some(idx) = self.running_index(task) else {
            return;
        };
        self.running -= 1;

        match outcome {
            ActionOutcome::Success { output } => {
                self.entries[idx].state = TaskState::Succeeded;
                info!(task = %task, "task succeeded");
                self.report.record(task, TaskStatus::Succeeded { output });
                self.on_prerequisite_satisfied(idx);
            }
            ActionOutcome::Failed { exit_code, output } => {
                self.entries[idx].state = TaskState::Failed;
                warn!(task = %task, exit_code, "task failed");
                self.report.record(
                    task,
                    TaskStatus::Failed {
                        cause: FailureCause::Action { exit_code, output },
                    },
                );
                if !self.options.keep_going && !self.halted {
                    self.halted = true;
                    info!("stopping dispatch of new tasks (keep-going is off)");
                }
                self.fail_dependents(idx);
            }
            ActionOutcome::Aborted => {
                self.entries[idx].state = TaskState::Aborted;
                info!(task = %task, "task aborted");
                self.report.record(task, TaskStatus::Aborted);
                // Actions abort only in response to the cancellation token,
                // so the rest of the run is torn down the same way.
                self.handle_abort();
            }
        }
    }

    fn handle_abort(&mut self) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.report.set_interrupted();
        info!("abort requested; marking not-yet-started tasks aborted");

        for idx in 0..self.entries.len() {
            if !self.entries[idx].state.is_terminal()
                && self.entries[idx].state != TaskState::Running
            {
                self.entries[idx].state = TaskState::Aborted;
                self.report
                    .record(self.entries[idx].name.clone(), TaskStatus::Aborted);
            }
        }
        self.ready.clear();
    }

    /// Look up a task that the shell reported on; it must be `Running`.
    fn running_index(&self, task: &str) -> Option<usize> {
        let Some(&idx) = self.index.get(task) else {
            warn!(task = %task, "event for unknown task; ignoring");
            return None;
        };
        if self.entries[idx].state != TaskState::Running {
            warn!(
                task = %task,
                state = ?self.entries[idx].state,
                "event for task that is not running; ignoring"
            );
            return None;
        }
        Some(idx)
    }

    /// A task reached `Succeeded` or `Skipped`: release its dependents.
    fn on_prerequisite_satisfied(&mut self, idx: usize) {
        let dependents = self.entries[idx].dependents.clone();
        for d in dependents {
            let entry = &mut self.entries[d];
            entry.remaining_deps -= 1;
            if entry.remaining_deps == 0 && entry.state == TaskState::Pending {
                entry.state = TaskState::Ready;
                self.ready.insert(d);
            }
        }
    }

    /// Mark all not-yet-started transitive dependents of a failed or aborted
    /// task as failed, without invoking their actions.
    fn fail_dependents(&mut self, origin: usize) {
        let mut stack: Vec<(usize, usize)> = self.entries[origin]
            .dependents
            .iter()
            .map(|&d| (d, origin))
            .collect();

        while let Some((d, parent)) = stack.pop() {
            if matches!(
                self.entries[d].state,
                TaskState::Pending | TaskState::Ready
            ) {
                self.ready.remove(&d);
                self.entries[d].state = TaskState::Failed;
                let dep = self.entries[parent].name.clone();
                let name = self.entries[d].name.clone();
                warn!(
                    task = %name,
                    prerequisite = %dep,
                    "prerequisite failed; marking dependent failed without running"
                );
                self.report.record(
                    name,
                    TaskStatus::Failed {
                        cause: FailureCause::Prerequisite { dep },
                    },
                );
                stack.extend(self.entries[d].dependents.iter().map(|&dd| (dd, d)));
            }
        }
    }

    /// Move ready tasks into `Running` while dispatch slots are free.
    fn dispatch(&mut self) -> Vec<Command> {
        if self.aborted || self.halted {
            return Vec::new();
        }

        let mut batch = Vec::new();
        while self.running < self.options.concurrency {
            let Some(&idx) = self.ready.first() else {
                break;
            };
            self.ready.remove(&idx);

            let deps_reran = self.entries[idx]
                .deps
                .iter()
                .any(|&d| self.entries[d].state == TaskState::Succeeded);

            let entry = &mut self.entries[idx];
            entry.state = TaskState::Running;
            self.running += 1;
            debug!(task = %entry.name, deps_reran, "dispatching task");

            batch.push(DispatchedTask {
                name: entry.name.clone(),
                command: entry.command.clone(),
                deps_reran,
            });
        }

        if batch.is_empty() {
            Vec::new()
        } else {
            vec![Command::Dispatch(batch)]
        }
    }

    fn all_terminal(&self) -> bool {
        self.entries.iter().all(|e| e.state.is_terminal())
    }

    fn finish_step(&mut self, commands: Vec<Command>) -> CoreStep {
        let mut finished = self.all_terminal();

        if !finished && self.running == 0 {
            // Nothing in flight and nothing was dispatched: either dispatch
            // is halted (failure/abort), or the plan is wedged, which cannot
            // happen for an acyclic plan.
            if !self.aborted && !self.halted {
                warn!("scheduler stalled with no running tasks; aborting remainder");
            }
            self.abort_remaining();
            finished = true;
        }

        if finished {
            debug!("scheduler run finished");
        }

        CoreStep { commands, finished }
    }

    /// Record every not-yet-started task as aborted when the run ends early.
    fn abort_remaining(&mut self) {
        for idx in 0..self.entries.len() {
            if matches!(
                self.entries[idx].state,
                TaskState::Pending | TaskState::Ready
            ) {
                self.entries[idx].state = TaskState::Aborted;
                self.report
                    .record(self.entries[idx].name.clone(), TaskStatus::Aborted);
            }
        }
        self.ready.clear();
    }
}
