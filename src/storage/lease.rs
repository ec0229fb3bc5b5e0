//! Exclusive lease on a cursor file
//!
//! Two crawls sharing one cursor would both read position N and race to
//! write N + 1. A lease is a `<cursor>.lock` file created with `create_new`;
//! it is removed when the lease is dropped.

use crate::storage::traits::{StorageError, StorageResult};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Held for the whole crawl; releases the lock file on drop
#[derive(Debug)]
pub struct CursorLease {
    lock_path: PathBuf,
}

impl CursorLease {
    /// Acquires the lease for the cursor at `cursor_path`
    ///
    /// # Returns
    ///
    /// * `Ok(CursorLease)` - The lock file was created
    /// * `Err(StorageError::Locked)` - Another crawl holds the lease
    pub fn acquire(cursor_path: &Path) -> StorageResult<Self> {
        let lock_path = lock_path_for(cursor_path);
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                tracing::debug!("Acquired cursor lease {}", lock_path.display());
                Ok(Self { lock_path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::Locked {
                path: cursor_path.display().to_string(),
                lock_path: lock_path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a lock file left behind by a crashed crawl
    pub fn force_release(cursor_path: &Path) -> StorageResult<bool> {
        match fs::remove_file(lock_path_for(cursor_path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(
                "Failed to release cursor lease {}: {}",
                self.lock_path.display(),
                e
            );
        }
    }
}

fn lock_path_for(cursor_path: &Path) -> PathBuf {
    let mut name = cursor_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cursor".into());
    name.push(".lock");
    cursor_path.with_file_name(name)
}
