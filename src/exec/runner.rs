// src/exec/runner.rs

//! Pluggable action runner abstraction.
//!
//! The scheduler runtime dispatches work through an `ActionRunner` instead
//! of spawning processes itself. Production code uses
//! [`crate::exec::ShellRunner`]; tests provide implementations that record
//! invocations and script their outcomes.

use std::future::Future;
use std::pin::Pin;

use crate::cancel::CancelToken;
use crate::sched::DispatchedTask;

/// Outcome of executing one task's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action completed successfully.
    Success { output: String },
    /// The action reported failure; `output` carries captured stdout/stderr.
    Failed { exit_code: i32, output: String },
    /// The action observed the cancellation token and stopped early.
    Aborted,
}

/// Trait abstracting how dispatched actions are executed.
///
/// Implementations receive the cancellation token and may honour it (the
/// production runner kills its child process) or ignore it and run to
/// completion; the scheduler never force-terminates an action.
pub trait ActionRunner: Send + Sync {
    fn run(
        &self,
        action: DispatchedTask,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ActionOutcome> + Send>>;
}
