//! Cursor storage traits and error types
//!
//! This module defines the trait interface for cursor backends and
//! associated error types.

use crate::state::MAX_SEQUENCE;
use thiserror::Error;

/// Errors that can occur during cursor storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cursor {path} is locked by another crawl (remove {lock_path} if it is stale)")]
    Locked { path: String, lock_path: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of reading the persisted cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorLoad {
    /// A valid position was stored
    Stored(u64),

    /// Nothing has been stored yet
    Missing,

    /// Something was stored but it is not an integer in `0..=MAX_SEQUENCE`
    Corrupt { raw: String },
}

impl CursorLoad {
    /// Interprets raw stored text
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<u64>() {
            Ok(position) if position <= MAX_SEQUENCE => Self::Stored(position),
            _ => Self::Corrupt {
                raw: raw.to_string(),
            },
        }
    }

    /// Position to resume from; missing and corrupt cursors restart at 0
    pub fn position(&self) -> u64 {
        match self {
            Self::Stored(position) => *position,
            Self::Missing | Self::Corrupt { .. } => 0,
        }
    }

    /// Warning to surface to the user, if the stored value was discarded
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Corrupt { raw } => Some(format!(
                "Stored cursor {:?} is not a valid page number, starting from 0",
                raw.trim()
            )),
            _ => None,
        }
    }
}

/// Trait for cursor storage backends
///
/// A cursor store holds exactly one integer. `save` must replace the previous
/// value atomically: after a crash the store holds either the old or the new
/// value, never a partial write.
pub trait CursorStore: Send {
    /// Reads the persisted cursor
    fn load(&self) -> StorageResult<CursorLoad>;

    /// Overwrites the persisted cursor with `position`
    fn save(&mut self, position: u64) -> StorageResult<()>;

    /// Human-readable location, used in log lines
    fn location(&self) -> String;
}
