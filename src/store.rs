//! Durable record storage
//!
//! Typed JSON read/write through the per-path lock registry. Writes create
//! parent directories as needed and replace the whole file; reads and writes
//! for the same path observe a total order. There is no atomic-rename step:
//! a crash mid-write can corrupt the file. Read-modify-write races are what
//! the lock prevents, and that is the extent of the durability contract.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock::{PathGuard, PathLocks};

/// Record store backed by JSON documents on disk
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    locks: PathLocks,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store sharing an existing lock registry
    pub fn with_locks(locks: PathLocks) -> Self {
        Self { locks }
    }

    /// The lock registry this store serializes through
    pub fn locks(&self) -> &PathLocks {
        &self.locks
    }

    /// Read a JSON document under the path's lock
    ///
    /// A missing file is an error; callers initialize documents through the
    /// namespace resolver before reading.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let file = self.exclusive(path).await;
        file.read().await
    }

    /// Write a JSON document under the path's lock, creating parent
    /// directories as needed
    pub async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let file = self.exclusive(path).await;
        file.write(value).await
    }

    /// Seed a document only when the file does not exist yet
    ///
    /// The existence check and the write happen under one lock acquisition,
    /// so two concurrent initializations cannot clobber each other.
    pub async fn write_json_if_absent<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let file = self.exclusive(path).await;
        if !file.exists().await? {
            file.write(value).await?;
        }
        Ok(())
    }

    /// Read, mutate, and write back one document under a single lock
    /// acquisition
    ///
    /// No other operation on the path can interleave between the read and
    /// the write. When `mutate` fails the document is left untouched.
    pub async fn update_json<T, R, F>(&self, path: &Path, mutate: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let file = self.exclusive(path).await;
        let mut value: T = file.read().await?;
        let result = mutate(&mut value)?;
        file.write(&value).await?;
        Ok(result)
    }

    /// Acquire the path's lock for a multi-step operation
    ///
    /// The returned handle reads and writes without re-locking; it is the
    /// building block for sequences like "read tasks, snapshot elsewhere,
    /// truncate" that must exclude concurrent writers throughout.
    pub async fn exclusive(&self, path: &Path) -> ExclusiveFile {
        let guard = self.locks.acquire(path).await;
        ExclusiveFile {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }
}

/// Exclusive handle on one file; the path stays locked until drop
#[derive(Debug)]
pub struct ExclusiveFile {
    path: PathBuf,
    _guard: PathGuard,
}

impl ExclusiveFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.path).await?)
    }

    pub async fn read<T: DeserializeOwned>(&self) -> Result<T> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn write<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        values: Vec<u32>,
    }

    #[tokio::test]
    async fn json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let store = RecordStore::new();

        let doc = Doc {
            values: vec![1, 2, 3],
        };
        store.write_json(&path, &doc).await.unwrap();
        let read_back: Doc = store.read_json(&path).await.unwrap();
        assert_eq!(doc, read_back);
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/doc.json");
        let store = RecordStore::new();

        store.write_json(&path, &Doc::default()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn read_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new();
        let result: Result<Doc> = store.read_json(&dir.path().join("absent.json")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn write_if_absent_does_not_clobber() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let store = RecordStore::new();

        store
            .write_json(&path, &Doc { values: vec![7] })
            .await
            .unwrap();
        store
            .write_json_if_absent(&path, &Doc::default())
            .await
            .unwrap();

        let doc: Doc = store.read_json(&path).await.unwrap();
        assert_eq!(doc.values, vec![7]);
    }

    #[tokio::test]
    async fn update_json_failure_leaves_document_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let store = RecordStore::new();
        store
            .write_json(&path, &Doc { values: vec![1] })
            .await
            .unwrap();

        let result: Result<()> = store
            .update_json(&path, |doc: &mut Doc| {
                doc.values.push(99);
                Err(crate::error::Error::DuplicateTaskName("x".to_string()))
            })
            .await;
        assert!(result.is_err());

        let doc: Doc = store.read_json(&path).await.unwrap();
        assert_eq!(doc.values, vec![1]);
    }

    #[tokio::test]
    async fn concurrent_updates_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let store = RecordStore::new();
        store.write_json(&path, &Doc::default()).await.unwrap();

        let writers = 32;
        let mut handles = Vec::with_capacity(writers);
        for idx in 0..writers as u32 {
            let store = store.clone();
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_json(&path, |doc: &mut Doc| {
                        doc.values.push(idx);
                        Ok(())
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut doc: Doc = store.read_json(&path).await.unwrap();
        doc.values.sort_unstable();
        assert_eq!(doc.values, (0..writers as u32).collect::<Vec<_>>());
    }
}
