//! Advisory lock guarding a store file.
//!
//! A store at `forum.db` is locked through a sidecar `forum.db.lock`. The
//! lock is exclusive and non-blocking: a second open fails immediately with
//! [`CoreError::StoreLocked`] instead of waiting.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds the exclusive lock until dropped.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Acquires the lock for the store at `store_path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreLocked`] if another handle holds the lock.
    pub fn acquire(store_path: &Path) -> CoreResult<Self> {
        let path = lock_path(store_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked {
                path: store_path.to_path_buf(),
            });
        }

        Ok(Self { path, _file: file })
    }

    /// Returns the path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns `<store_path>.lock`.
#[must_use]
pub fn lock_path(store_path: &Path) -> PathBuf {
    sibling_with_suffix(store_path, ".lock")
}

/// Appends `suffix` to the file name of `path`.
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
