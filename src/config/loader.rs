// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{BuildFile, RawBuildFile};
use crate::errors::Result;

/// Load a build file from a given path and return the raw `RawBuildFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (DAG correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Deserialize a build file from TOML text, without validation.
pub fn load_from_str(contents: &str) -> Result<RawBuildFile> {
    let raw: RawBuildFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a build file from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown or self-referential `deps` entries,
///   - dependency cycles,
///   - basic `[build]` sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BuildFile> {
    let raw = load_from_path(&path)?;
    let build_file = BuildFile::try_from(raw)?;
    Ok(build_file)
}

/// Helper to resolve a default build file path.
///
/// Currently this just returns `Dagmake.toml` in the current working
/// directory.
pub fn default_build_file_path() -> PathBuf {
    PathBuf::from("Dagmake.toml")
}
