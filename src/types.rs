use std::str::FromStr;

use serde::Deserialize;

/// How the staleness evaluator decides whether a task's outputs are out of
/// date relative to its inputs.
///
/// - `Timestamp`: compare the newest input mtime against the oldest output
///   mtime (default behaviour).
/// - `Fingerprint`: compare a blake3 content fingerprint of the inputs
///   against the fingerprint recorded after the last successful run. Robust
///   against clock skew and touched-but-unchanged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessMode {
    Timestamp,
    Fingerprint,
}

impl Default for StalenessMode {
    fn default() -> Self {
        StalenessMode::Timestamp
    }
}

impl FromStr for StalenessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timestamp" => Ok(StalenessMode::Timestamp),
            "fingerprint" => Ok(StalenessMode::Fingerprint),
            other => Err(format!(
                "invalid staleness mode: {other} (expected \"timestamp\" or \"fingerprint\")"
            )),
        }
    }
}

/// Where recorded task fingerprints live between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStorageMode {
    /// Store fingerprints in a file (`.dagmake/state`).
    File,
    /// Store fingerprints in memory only (lost at process exit).
    Memory,
}

impl Default for StateStorageMode {
    fn default() -> Self {
        StateStorageMode::File
    }
}

impl FromStr for StateStorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StateStorageMode::File),
            "memory" => Ok(StateStorageMode::Memory),
            other => Err(format!(
                "invalid state storage mode: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}
