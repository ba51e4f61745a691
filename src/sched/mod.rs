// src/sched/mod.rs

//! Scheduling and execution of an [`crate::graph::ExecutionPlan`].
//!
//! The pure core state machine lives in [`core`]: it consumes
//! [`SchedEvent`]s and produces dispatch commands, with no channels, Tokio
//! types, or I/O, so the scheduling semantics are unit-testable in
//! isolation. The async I/O shell is implemented in [`runtime`]: it owns the
//! event channel, evaluates staleness at dispatch time, and delegates action
//! execution to an [`crate::exec::ActionRunner`].

pub mod core;
pub mod runtime;

use crate::exec::ActionOutcome;
use crate::graph::TaskName;

pub use self::core::{Command, CoreStep, RunOptions, SchedulerCore, TaskState};
pub use self::runtime::BuildRuntime;

/// Events flowing into the scheduler core.
#[derive(Debug, Clone)]
pub enum SchedEvent {
    /// A dispatched action finished with a concrete outcome.
    ActionFinished {
        task: TaskName,
        outcome: ActionOutcome,
    },
    /// The staleness evaluator found a dispatched task's outputs up to date;
    /// its action was not invoked.
    TaskUpToDate { task: TaskName },
    /// Cooperative cancellation was signalled (e.g. Ctrl-C).
    AbortRequested,
}

/// Description of a task the core wants the shell to execute now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedTask {
    pub name: TaskName,
    /// Opaque action handle, interpreted by the action runner.
    pub command: String,
    /// Whether any prerequisite actually ran (was not skipped) this
    /// invocation; feeds the staleness decision.
    pub deps_reran: bool,
}
