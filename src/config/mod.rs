// src/config/mod.rs

//! Build file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a build file from disk (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_build_file_path, load_and_validate, load_from_path, load_from_str};
pub use model::{BuildFile, BuildSection, RawBuildFile, TaskSection};
