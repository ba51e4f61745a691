// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dagmake`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagmake",
    version,
    about = "Run a task-graph build with incremental re-execution.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to build. With no targets, every task in the build file is
    /// requested.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the build file (TOML).
    ///
    /// Default: `Dagmake.toml` in the current working directory.
    #[arg(short = 'f', long, value_name = "PATH", default_value = "Dagmake.toml")]
    pub file: String,

    /// Maximum number of tasks to run concurrently.
    ///
    /// Defaults to `[build].jobs` from the build file, or the available
    /// parallelism of the machine.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Keep building independent subgraphs after a task fails.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Resolve and print the execution plan, but run nothing.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Use content fingerprints instead of timestamps for staleness checks.
    #[arg(long)]
    pub fingerprint: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGMAKE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
