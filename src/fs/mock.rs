// src/fs/mock.rs

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone)]
struct MockFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

/// In-memory filesystem for tests.
///
/// Directories are implicit: a path is a directory if any file lives below
/// it. Modification times are settable, which is what makes timestamp
/// staleness testable without sleeping.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, MockFile>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file with an mtime of `UNIX_EPOCH + age_secs`.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>, age_secs: u64) {
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.as_ref().to_path_buf(),
            MockFile {
                contents: contents.into(),
                modified: SystemTime::UNIX_EPOCH + Duration::from_secs(age_secs),
            },
        );
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref());
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, age_secs: u64) {
        let mut files = self.files.lock().unwrap();
        if let Some(file) = files.get_mut(path.as_ref()) {
            file.modified = SystemTime::UNIX_EPOCH + Duration::from_secs(age_secs);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.keys().any(|p| p != path && p.starts_with(path))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| anyhow!("no such mock file: {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.files.lock().unwrap();
        let file = files
            .get(path)
            .ok_or_else(|| anyhow!("no such mock file: {:?}", path))?;
        Ok(Box::new(Cursor::new(file.contents.clone())))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        if !files.keys().any(|p| p != path && p.starts_with(path)) {
            return Err(anyhow!("no such mock directory: {:?}", path));
        }

        let mut entries: Vec<PathBuf> = Vec::new();
        for candidate in files.keys() {
            if let Ok(rest) = candidate.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    let child = path.join(first.as_os_str());
                    if !entries.contains(&child) {
                        entries.push(child);
                    }
                }
            }
        }
        Ok(entries)
    }
}
