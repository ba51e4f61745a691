// src/stale/fingerprint.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Compute the fingerprint of a single file's contents.
pub fn compute_file_fingerprint(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for fingerprinting: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic fingerprint over the contents of the given files.
///
/// Order of `paths` does not matter; we sort them before hashing to keep the
/// fingerprint stable. Paths that are not files are skipped.
pub fn compute_fingerprint_for_paths<I, P>(fs: &dyn FileSystem, paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    for path in paths_vec {
        if fs.is_file(&path) {
            debug!("fingerprinting file {:?}", path);
            let file_fp = compute_file_fingerprint(fs, &path)?;
            hasher.update(file_fp.as_bytes());
        }
    }

    let fp = hasher.finalize().to_hex().to_string();
    debug!(fingerprint = %fp, "computed aggregate fingerprint");
    Ok(fp)
}

/// Per-invocation cache of file fingerprints.
///
/// Tasks frequently share inputs (headers, generated files); this avoids
/// re-reading and re-hashing the same file for every task that lists it.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    fingerprints: HashMap<PathBuf, String>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the fingerprint for a file, computing and caching it if necessary.
    pub fn get_or_compute(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        if let Some(fp) = self.fingerprints.get(path) {
            return Ok(fp.clone());
        }

        debug!("cache miss: fingerprinting {:?}", path);
        let fp = compute_file_fingerprint(fs, path)?;
        self.fingerprints.insert(path.to_path_buf(), fp.clone());
        Ok(fp)
    }
}
