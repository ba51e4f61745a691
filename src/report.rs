// src/report.rs

//! Build report: the aggregate of all task outcomes for one invocation.
//!
//! The report is created when a run starts, owned and mutated exclusively by
//! the scheduler core while the run is in flight, and handed to the caller
//! for rendering and exit-code derivation when the run ends.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::graph::TaskName;

/// Why a task is recorded as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The task's own action reported failure.
    Action { exit_code: i32, output: String },
    /// A prerequisite failed, so this task's action was never invoked.
    Prerequisite { dep: TaskName },
}

/// Outcome of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Outputs were up to date; the action was not invoked.
    Skipped,
    /// The action ran and succeeded.
    Succeeded { output: String },
    /// The action failed, or a prerequisite did.
    Failed { cause: FailureCause },
    /// Cancellation (or stop-on-failure) reached this task before it ran.
    Aborted,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Skipped => "skipped",
            TaskStatus::Succeeded { .. } => "succeeded",
            TaskStatus::Failed { .. } => "failed",
            TaskStatus::Aborted => "aborted",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed { .. } | TaskStatus::Aborted)
    }
}

/// Aggregate of all task outcomes plus overall status.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    outcomes: BTreeMap<TaskName, TaskStatus>,
    interrupted: bool,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's terminal outcome. Later records for the same task
    /// overwrite earlier ones; the scheduler only records terminal states,
    /// once each.
    pub fn record(&mut self, task: impl Into<TaskName>, status: TaskStatus) {
        self.outcomes.insert(task.into(), status);
    }

    /// Mark the run as interrupted by cancellation. Distinct from ordinary
    /// failure in both rendering and exit code.
    pub fn set_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn status_of(&self, task: &str) -> Option<&TaskStatus> {
        self.outcomes.get(task)
    }

    /// All recorded outcomes, ordered by task name.
    pub fn outcomes(&self) -> impl Iterator<Item = (&TaskName, &TaskStatus)> {
        self.outcomes.iter()
    }

    pub fn count(&self, matcher: impl Fn(&TaskStatus) -> bool) -> usize {
        self.outcomes.values().filter(|s| matcher(s)).count()
    }

    /// True when every task is succeeded or skipped and the run was not
    /// interrupted.
    pub fn success(&self) -> bool {
        !self.interrupted && !self.outcomes.values().any(TaskStatus::is_failure)
    }

    /// Process exit code: 0 on success, 130 when interrupted, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else if self.interrupted {
            130
        } else {
            1
        }
    }

    /// Render the report as human-readable text, enumerating every task
    /// outcome and the captured output of each failure.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let succeeded = self.count(|s| matches!(s, TaskStatus::Succeeded { .. }));
        let skipped = self.count(|s| matches!(s, TaskStatus::Skipped));
        let failed = self.count(|s| matches!(s, TaskStatus::Failed { .. }));
        let aborted = self.count(|s| matches!(s, TaskStatus::Aborted));

        let _ = write!(
            out,
            "build {}: {succeeded} succeeded, {skipped} skipped, {failed} failed, {aborted} aborted",
            if self.interrupted {
                "interrupted"
            } else if self.success() {
                "succeeded"
            } else {
                "failed"
            }
        );
        let _ = writeln!(out);

        for (name, status) in self.outcomes.iter() {
            let _ = writeln!(out, "  {name}: {}", status.label());
            if let TaskStatus::Failed { cause } = status {
                match cause {
                    FailureCause::Action { exit_code, output } => {
                        let _ = writeln!(out, "    exit code {exit_code}");
                        for line in output.lines() {
                            let _ = writeln!(out, "    | {line}");
                        }
                    }
                    FailureCause::Prerequisite { dep } => {
                        let _ = writeln!(out, "    prerequisite '{dep}' failed");
                    }
                }
            }
        }

        out
    }
}
