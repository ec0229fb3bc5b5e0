//! Storage module for the crawl checkpoint
//!
//! This module persists the crawl cursor, the next sequence number to fetch,
//! so an interrupted crawl resumes near where it stopped:
//! - Plain-text cursor file written with an atomic rename
//! - In-memory cursor for tests and dry runs
//! - Lock-file lease preventing two crawls from sharing one cursor

mod file;
mod lease;
mod traits;

pub use file::{FileCursorStore, MemoryCursorStore};
pub use lease::CursorLease;
pub use traits::{CursorLoad, CursorStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the cursor file store at `path`
///
/// The file does not need to exist yet; a missing file loads as position 0.
pub fn open_cursor_store(path: &Path) -> FileCursorStore {
    FileCursorStore::new(path)
}

/// Loads the cursor and logs a warning when the stored value had to be discarded
///
/// # Returns
///
/// * `Ok(u64)` - The position to start from (0 when missing or unreadable)
/// * `Err(StorageError)` - The cursor location could not be read at all
pub fn load_position(store: &dyn CursorStore) -> StorageResult<u64> {
    let loaded = store.load()?;
    if let Some(warning) = loaded.warning() {
        tracing::warn!("{}", warning);
    }
    Ok(loaded.position())
}
