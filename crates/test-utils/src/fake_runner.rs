use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use dagmake::cancel::CancelToken;
use dagmake::exec::{ActionOutcome, ActionRunner};
use dagmake::sched::DispatchedTask;

/// A fake action runner that:
/// - records which tasks were "run"
/// - immediately returns a scripted outcome (success unless overridden).
#[derive(Clone, Default)]
pub struct FakeRunner {
    executed: Arc<Mutex<Vec<String>>>,
    outcomes: Arc<Mutex<HashMap<String, ActionOutcome>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure outcome for the named task.
    pub fn fail_task(&self, name: &str, exit_code: i32) {
        self.outcomes.lock().unwrap().insert(
            name.to_string(),
            ActionOutcome::Failed {
                exit_code,
                output: format!("{name}: scripted failure"),
            },
        );
    }

    /// Names of tasks whose actions were invoked, in invocation order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl ActionRunner for FakeRunner {
    fn run(
        &self,
        action: DispatchedTask,
        _cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ActionOutcome> + Send>> {
        let executed = Arc::clone(&self.executed);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&action.name)
            .cloned()
            .unwrap_or(ActionOutcome::Success {
                output: format!("ran {}", action.name),
            });

        Box::pin(async move {
            executed.lock().unwrap().push(action.name);
            outcome
        })
    }
}

/// An action runner whose tasks block until the test releases them.
///
/// Useful for asserting concurrency bounds and abort behaviour: the test can
/// observe which tasks have started while they are still "running", then
/// release them one by one.
#[derive(Clone, Default)]
pub struct BlockingRunner {
    started: Arc<Mutex<Vec<String>>>,
    gates: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
    outcomes: Arc<Mutex<HashMap<String, ActionOutcome>>>,
    /// If true, tasks ignore the cancellation token and run until released,
    /// like a non-cooperative action.
    ignore_cancel: bool,
}

impl BlockingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose actions do not honour the cancellation token.
    pub fn non_cooperative() -> Self {
        Self {
            ignore_cancel: true,
            ..Self::default()
        }
    }

    /// Script a failure outcome for the named task.
    pub fn fail_task(&self, name: &str, exit_code: i32) {
        self.outcomes.lock().unwrap().insert(
            name.to_string(),
            ActionOutcome::Failed {
                exit_code,
                output: format!("{name}: scripted failure"),
            },
        );
    }

    /// Names of tasks whose actions have started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Allow the named task's action to complete.
    pub fn release(&self, name: &str) {
        self.gate(name).notify_one();
    }

    fn gate(&self, name: &str) -> Arc<Notify> {
        let mut gates = self.gates.lock().unwrap();
        gates
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

impl ActionRunner for BlockingRunner {
    fn run(
        &self,
        action: DispatchedTask,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ActionOutcome> + Send>> {
        let started = Arc::clone(&self.started);
        let gate = self.gate(&action.name);
        let ignore_cancel = self.ignore_cancel;
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&action.name)
            .cloned()
            .unwrap_or(ActionOutcome::Success {
                output: format!("ran {}", action.name),
            });

        Box::pin(async move {
            started.lock().unwrap().push(action.name);

            if ignore_cancel {
                gate.notified().await;
            } else {
                tokio::select! {
                    _ = gate.notified() => {}
                    _ = cancel.cancelled() => return ActionOutcome::Aborted,
                }
            }

            outcome
        })
    }
}
