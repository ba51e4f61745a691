// src/exec/mod.rs

//! Action execution layer.
//!
//! The scheduler treats a task's action as an opaque capability: something
//! that can be executed and reports an outcome plus captured output text.
//!
//! - [`runner`] defines the `ActionRunner` trait the scheduler runtime talks
//!   to, so tests can substitute fakes that never spawn processes.
//! - [`shell`] provides the production `ShellRunner`, which runs each
//!   action's command under the platform shell via `tokio::process`.

pub mod runner;
pub mod shell;

pub use runner::{ActionOutcome, ActionRunner};
pub use shell::ShellRunner;
