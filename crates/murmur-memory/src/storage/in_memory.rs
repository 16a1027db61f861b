//! Map-backed device

use super::{LineStream, StorageBackend};
use crate::error::{MemoryError, MemoryResult};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};

/// Storage device kept entirely in RAM
///
/// Useful for tests and for running the assistant without a card. The device
/// can be flipped read-only to simulate a write-protected or worn-out card.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
    read_only: AtomicBool,
}

impl InMemoryStorage {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file before use
    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .write()
            .insert(Self::normalize(path), contents.into());
        self
    }

    /// Reject every write with a permission error
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Current contents of a file as text
    pub fn contents(&self, path: &str) -> Option<String> {
        self.files
            .read()
            .get(&Self::normalize(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Paths of all stored files, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn normalize(path: &str) -> String {
        format!("/{}", path.trim_start_matches('/'))
    }

    fn check_writable(&self, path: &str) -> MemoryResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(MemoryError::file_open(
                path,
                Error::new(ErrorKind::PermissionDenied, "device is read-only"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn exists(&self, path: &str) -> MemoryResult<bool> {
        Ok(self.files.read().contains_key(&Self::normalize(path)))
    }

    async fn read_lines(&self, path: &str) -> MemoryResult<Option<LineStream>> {
        let Some(bytes) = self.read(path).await? else {
            return Ok(None);
        };

        let text = String::from_utf8(bytes)
            .map_err(|e| MemoryError::storage("read_lines", Error::new(ErrorKind::InvalidData, e)))?;
        let lines: Vec<std::io::Result<String>> =
            text.lines().map(|line| Ok(line.to_string())).collect();

        Ok(Some(futures::stream::iter(lines).boxed()))
    }

    async fn read(&self, path: &str) -> MemoryResult<Option<Vec<u8>>> {
        Ok(self.files.read().get(&Self::normalize(path)).cloned())
    }

    async fn append(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        self.check_writable(path)?;
        self.files
            .write()
            .entry(Self::normalize(path))
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    async fn write(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        self.check_writable(path)?;
        self.files
            .write()
            .insert(Self::normalize(path), data.to_vec());
        Ok(())
    }

    async fn replace(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        // A single map insert is already all-or-nothing
        self.write(path, data).await
    }

    async fn remove(&self, path: &str) -> MemoryResult<bool> {
        self.check_writable(path)?;
        Ok(self.files.write().remove(&Self::normalize(path)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_paths_are_normalized() {
        let storage = InMemoryStorage::new();
        storage.append("memory.txt", b"a:1\n").await.unwrap();

        assert!(storage.exists("/memory.txt").await.unwrap());
        assert_eq!(storage.contents("/memory.txt").as_deref(), Some("a:1\n"));
        assert_eq!(storage.paths(), vec!["/memory.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_read_lines_strips_crlf() {
        let storage = InMemoryStorage::new().with_file("/memory.txt", "name:John\r\nage:30\r\n");

        let lines: Vec<String> = storage
            .read_lines("/memory.txt")
            .await
            .unwrap()
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, vec!["name:John", "age:30"]);
    }

    #[tokio::test]
    async fn test_read_only_rejects_writes() {
        let storage = InMemoryStorage::new().with_file("/memory.txt", "a:1\n");
        storage.set_read_only(true);

        let err = storage.append("/memory.txt", b"b:2\n").await.unwrap_err();
        assert!(matches!(err, MemoryError::FileOpen { .. }));
        assert_eq!(storage.contents("/memory.txt").as_deref(), Some("a:1\n"));

        // Reads still work
        assert!(storage.read("/memory.txt").await.unwrap().is_some());
    }
}
