//! File-based locking for single-process ownership of a snapshot root.
//!
//! Cross-platform (fs2) advisory lock on `<root>/LOCK`, exclusive only: one
//! process owns the root, its metadata file and its directory tree. The lock
//! is released on Drop.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::consts::LOCK_FILE;
use crate::error::{Error, Result};

/// Held exclusive lock on a snapshot root.
pub struct RootLock {
    file: std::fs::File,
    path: PathBuf,
}

impl RootLock {
    /// Acquire the root lock, blocking until it is free.
    pub fn acquire(root: &Path) -> Result<Self> {
        let (file, path) = open_lock_file(root)?;
        file.lock_exclusive()
            .map_err(|e| Error::io(e, "lock_exclusive", &path))?;
        Ok(Self { file, path })
    }

    /// Acquire the root lock without blocking. Fails if another process
    /// holds it.
    pub fn try_acquire(root: &Path) -> Result<Self> {
        let (file, path) = open_lock_file(root)?;
        file.try_lock_exclusive()
            .map_err(|e| Error::io(e, "try_lock_exclusive", &path))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

impl std::fmt::Debug for RootLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootLock").field("path", &self.path).finish()
    }
}

fn open_lock_file(root: &Path) -> Result<(std::fs::File, PathBuf)> {
    let path = root.join(LOCK_FILE);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| Error::io(e, "open lock file", &path))?;
    Ok((f, path))
}
