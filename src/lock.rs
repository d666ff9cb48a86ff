//! Per-path mutual exclusion for file operations
//!
//! This module provides the concurrency backbone of the store: a registry of
//! async mutexes keyed by normalized absolute path. Two operations on the
//! same logical file never overlap; operations on different files proceed
//! concurrently. Waiters suspend on the runtime instead of blocking a thread.
//!
//! The registry is an owned value, not a process-global: tests and embedders
//! construct a fresh one per store. Locking does not span processes or
//! machines; that is a documented limitation, not a goal.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-path exclusive locks
///
/// Cloning is cheap and shares the underlying registry. Entries are created
/// on first use and live for the registry's lifetime; the map is bounded by
/// the number of distinct files the store touches.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

/// Guard holding exclusive access to one path; released on drop
#[derive(Debug)]
pub struct PathGuard {
    _guard: OwnedMutexGuard<()>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for `path`, suspending until it is free
    ///
    /// Callers for the same normalized path are serialized; distinct paths
    /// are independent. Fairness is the runtime's: waiters make eventual
    /// progress, strict FIFO ordering is not guaranteed to callers.
    pub async fn acquire(&self, path: &Path) -> PathGuard {
        let entry = self.entry(path);
        PathGuard {
            _guard: entry.lock_owned().await,
        }
    }

    /// Run `op` while holding the exclusive lock for `path`
    ///
    /// The lock is released when `op` completes, including when it returns
    /// an error.
    pub async fn with_exclusive<F, Fut, T>(&self, path: &Path, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(path).await;
        op().await
    }

    fn entry(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let key = normalize(path);
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(key).or_default())
    }
}

/// Normalize a path lexically so spelling variants map to one lock entry
///
/// Relative paths are resolved against the current directory; `.` segments
/// are dropped and `..` pops its parent. The file need not exist, so this
/// never touches the filesystem beyond the cwd lookup.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
