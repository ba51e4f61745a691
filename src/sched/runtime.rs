// src/sched/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::exec::{ActionOutcome, ActionRunner};
use crate::graph::{ExecutionPlan, PlannedTask};
use crate::report::BuildReport;
use crate::sched::core::{Command, CoreStep, SchedulerCore};
use crate::sched::{DispatchedTask, SchedEvent};
use crate::stale::StalenessEvaluator;

/// Async I/O shell around [`SchedulerCore`].
///
/// Drives the core with events from a channel, evaluates staleness when the
/// core dispatches a task, and delegates actual execution to an
/// [`ActionRunner`]. The core remains the single source of truth for
/// scheduling semantics and the single owner of the build report.
pub struct BuildRuntime<R: ActionRunner + 'static> {
    core: SchedulerCore,
    plan: ExecutionPlan,
    evaluator: StalenessEvaluator,
    runner: Arc<R>,
    event_tx: mpsc::Sender<SchedEvent>,
    event_rx: mpsc::Receiver<SchedEvent>,
    /// Events synthesized locally (up-to-date skips, pre-dispatch abort
    /// checks); processed before channel events, deterministically.
    inbox: VecDeque<SchedEvent>,
    cancel: CancelToken,
}

impl<R: ActionRunner + 'static> fmt::Debug for BuildRuntime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<R: ActionRunner + 'static> BuildRuntime<R> {
    pub fn new(
        core: SchedulerCore,
        plan: ExecutionPlan,
        evaluator: StalenessEvaluator,
        runner: R,
        cancel: CancelToken,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<SchedEvent>(64);
        Self {
            core,
            plan,
            evaluator,
            runner: Arc::new(runner),
            event_tx,
            event_rx,
            inbox: VecDeque::new(),
            cancel,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the core and executes its initial dispatches.
    /// - Consumes events (locally synthesized first, then channel).
    /// - Feeds them into the core and executes the returned commands.
    /// - Stops when the core reports the run finished.
    pub async fn run(mut self) -> Result<BuildReport> {
        info!("build runtime started");

        // Cancellation -> abort event. The token fires at most once.
        {
            let cancel = self.cancel.clone();
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                let _ = tx.send(SchedEvent::AbortRequested).await;
            });
        }

        let mut step = self.core.start();

        loop {
            let CoreStep { commands, finished } = step;
            for command in commands {
                self.execute_command(command)?;
            }
            if finished {
                break;
            }

            let event = if let Some(event) = self.inbox.pop_front() {
                event
            } else {
                match self.event_rx.recv().await {
                    Some(event) => event,
                    None => {
                        info!("runtime event channel closed; stopping");
                        break;
                    }
                }
            };

            debug!(?event, "runtime received event");
            self.note_outcome(&event)?;
            step = self.core.step(event);
        }

        info!("build runtime finished");
        Ok(self.core.into_report())
    }

    fn execute_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Dispatch(tasks) => {
                for task in tasks {
                    self.dispatch_one(task)?;
                }
            }
        }
        Ok(())
    }

    fn dispatch_one(&mut self, task: DispatchedTask) -> Result<()> {
        // Dispatch boundary: if cancellation arrived after the core decided
        // to dispatch, don't start the action.
        if self.cancel.is_cancelled() {
            self.inbox.push_back(SchedEvent::ActionFinished {
                task: task.name,
                outcome: ActionOutcome::Aborted,
            });
            return Ok(());
        }

        let planned = self
            .planned_task(&task.name)
            .expect("core only dispatches tasks from the plan")
            .clone();

        if !self.evaluator.is_stale(&planned, task.deps_reran)? {
            self.inbox
                .push_back(SchedEvent::TaskUpToDate { task: task.name });
            return Ok(());
        }

        let fut = self.runner.run(task.clone(), self.cancel.clone());
        let tx = self.event_tx.clone();
        let name = task.name;
        tokio::spawn(async move {
            let outcome = fut.await;
            let _ = tx.send(SchedEvent::ActionFinished { task: name, outcome }).await;
        });

        Ok(())
    }

    /// Record side effects of an outcome before the core consumes it:
    /// a successful run stores the task's new input fingerprint.
    fn note_outcome(&mut self, event: &SchedEvent) -> Result<()> {
        if let SchedEvent::ActionFinished {
            task,
            outcome: ActionOutcome::Success { .. },
        } = event
        {
            if let Some(planned) = self.planned_task(task) {
                let planned = planned.clone();
                self.evaluator.record_success(&planned)?;
            }
        }
        Ok(())
    }

    fn planned_task(&self, name: &str) -> Option<&PlannedTask> {
        self.plan.tasks().iter().find(|t| t.name == name)
    }
}
