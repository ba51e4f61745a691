// src/stale/inputs.rs

//! Expansion of a task's declared inputs into concrete file paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::stale::state::STATE_FILE_PATH;

/// Expand declared inputs into a sorted, deduplicated list of file paths.
///
/// Entries without glob metacharacters are treated as literal paths (kept
/// whether or not they exist, so the evaluator can treat missing inputs as
/// stale). Entries with metacharacters are matched against the project tree
/// rooted at `root`; the `.dagmake` state directory is never walked.
pub fn expand_inputs(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut builder = GlobSetBuilder::new();
    let mut has_globs = false;

    for pattern in patterns {
        if is_glob(pattern) {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid input pattern '{pattern}'"))?;
            builder.add(glob);
            has_globs = true;
        } else {
            files.push(absolute(root, Path::new(pattern)));
        }
    }

    if has_globs {
        let glob_set = builder.build().context("compiling input patterns")?;
        walk_matching(fs, root, root, &glob_set, &mut files)?;
    }

    files.sort();
    files.dedup();

    debug!(count = files.len(), "expanded task inputs");
    Ok(files)
}

/// Resolve a possibly-relative path against the project root.
pub fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn walk_matching(
    fs: &dyn FileSystem,
    root: &Path,
    dir: &Path,
    glob_set: &GlobSet,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let state_dir = root.join(STATE_FILE_PATH).parent().map(Path::to_path_buf);

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs.read_dir(&current)? {
            if Some(&entry) == state_dir.as_ref() {
                continue;
            }
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                let relative = entry.strip_prefix(root).unwrap_or(&entry);
                if glob_set.is_match(relative) {
                    out.push(entry);
                }
            }
        }
    }
    Ok(())
}
