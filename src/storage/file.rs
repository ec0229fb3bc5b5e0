//! File-backed and in-memory cursor stores

use crate::storage::traits::{CursorLoad, CursorStore, StorageResult};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Cursor persisted as a single plain-text integer
///
/// Saves write `<path>.tmp`, sync it, then rename it over `<path>`.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    /// Creates a store for the cursor file at `path`
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Path of the cursor file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cursor".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> StorageResult<CursorLoad> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(CursorLoad::from_raw(&raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CursorLoad::Missing),
            // Bytes that are not UTF-8 are as unusable as any other garbage
            Err(e) if e.kind() == ErrorKind::InvalidData => Ok(CursorLoad::Corrupt {
                raw: String::from_utf8_lossy(&fs::read(&self.path)?).into_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, position: u64) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            writeln!(file, "{}", position)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Saved cursor {} to {}", position, self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Cursor held in memory
///
/// Clones share the same value, so a test can keep a handle while the
/// coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursorStore {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `raw`, which may be any text
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.to_string()))),
        }
    }

    /// Current stored position, if a valid one is stored
    pub fn current(&self) -> Option<u64> {
        match self.load() {
            Ok(CursorLoad::Stored(position)) => Some(position),
            _ => None,
        }
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> StorageResult<CursorLoad> {
        let raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        Ok(match raw.as_deref() {
            Some(text) => CursorLoad::from_raw(text),
            None => CursorLoad::Missing,
        })
    }

    fn save(&mut self, position: u64) -> StorageResult<()> {
        let mut raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        *raw = Some(position.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
