//! Exclusive lock over a vector store directory.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

use crate::error::{Error, Result};

const LOCK_FILE: &str = ".lock";

/// Held while an index build writes to a store; released on drop.
pub struct StoreLock {
    lock_file: Option<File>,
    path: PathBuf,
}

impl StoreLock {
    /// Lock `dir`, creating it if needed. Fails with `StoreLocked` when
    /// another build holds the lock.
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
                path,
            }),
            Err(_) => {
                warn!("Store {} is being built by another process", dir.display());
                Err(Error::StoreLocked)
            }
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        self.release();
    }
}
