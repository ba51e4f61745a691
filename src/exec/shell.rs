// src/exec/shell.rs

//! Production action runner: one shell process per action.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::exec::runner::{ActionOutcome, ActionRunner};
use crate::sched::DispatchedTask;

/// Runs each action's command under the platform shell, in the project root,
/// with stdout and stderr captured.
///
/// Honours the cancellation token: if it fires while the child is running,
/// the child is killed and the outcome is [`ActionOutcome::Aborted`].
#[derive(Debug, Clone)]
pub struct ShellRunner {
    root: PathBuf,
}

impl ShellRunner {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ActionRunner for ShellRunner {
    fn run(
        &self,
        action: DispatchedTask,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = ActionOutcome> + Send>> {
        let root = self.root.clone();
        Box::pin(async move { run_shell_action(action, root, cancel).await })
    }
}

async fn run_shell_action(
    action: DispatchedTask,
    root: PathBuf,
    cancel: CancelToken,
) -> ActionOutcome {
    info!(task = %action.name, cmd = %action.command, "starting action process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&action.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&action.command);
        c
    };

    cmd.current_dir(&root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(task = %action.name, error = %err, "failed to spawn action process");
            return ActionOutcome::Failed {
                exit_code: -1,
                output: format!("failed to spawn process: {err}"),
            };
        }
    };

    // Drain both pipes concurrently so a chatty child cannot fill a buffer
    // and deadlock against our wait().
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_handle = tokio::spawn(read_to_string(stdout));
    let stderr_handle = tokio::spawn(read_to_string(stderr));

    tokio::select! {
        status_res = child.wait() => {
            let mut output = stdout_handle.await.unwrap_or_default();
            output.push_str(&stderr_handle.await.unwrap_or_default());

            match status_res {
                Ok(status) if status.success() => {
                    debug!(task = %action.name, "action process exited successfully");
                    ActionOutcome::Success { output }
                }
                Ok(status) => {
                    let exit_code = status.code().unwrap_or(-1);
                    info!(task = %action.name, exit_code, "action process failed");
                    ActionOutcome::Failed { exit_code, output }
                }
                Err(err) => {
                    warn!(task = %action.name, error = %err, "waiting for action process failed");
                    ActionOutcome::Failed {
                        exit_code: -1,
                        output: format!("{output}waiting for process: {err}"),
                    }
                }
            }
        }

        _ = cancel.cancelled() => {
            info!(task = %action.name, "cancellation requested; killing action process");
            if let Err(err) = child.kill().await {
                warn!(task = %action.name, error = %err, "failed to kill action process");
            }
            ActionOutcome::Aborted
        }
    }
}

async fn read_to_string(pipe: Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    let mut out = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut out).await;
    }
    out
}
