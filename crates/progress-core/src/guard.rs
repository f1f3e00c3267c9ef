//! Optimistic compare-and-swap for document writes.
//!
//! Each document gets its own mutex, looked up by canonical path in a
//! concurrent map. The read-compare-write sequence for one document runs
//! entirely under that mutex, so two writers holding the same base revision
//! cannot both pass the comparison. Writers of different documents never
//! touch each other's lock.

use crate::error::{ProgressError, Result};
use crate::revision::{Precondition, Revision};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` inside the critical section for `path`.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(&self.inner.entry(path.to_path_buf()).or_default());
        let result = {
            // The mutex guards no data, so a poisoned lock is still usable.
            let _held = lock.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };
        drop(lock);
        self.inner
            .remove_if(path, |_, l| Arc::strong_count(l) == 1);
        result
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.inner.len()
    }
}

/// Compare the caller's precondition against the stored snapshot.
pub fn check(
    display_path: &str,
    expected: &Precondition,
    current: &Revision,
    current_mtime: i64,
) -> Result<()> {
    if expected.matches(current, current_mtime) {
        return Ok(());
    }
    tracing::debug!(
        path = display_path,
        expected = %expected.rev,
        current = %current,
        "revision precondition failed"
    );
    Err(ProgressError::Conflict {
        path: display_path.to_string(),
        current_rev: current.to_string(),
        current_mtime,
    })
}
