//! Host filesystem device

use super::{LineStream, StorageBackend};
use crate::error::{MemoryError, MemoryResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

/// Directory on the host acting as the mounted SD card
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Mount a directory as the storage device
    ///
    /// Fails with [`MemoryError::StorageUnavailable`] if the root is missing or
    /// is not a directory.
    pub async fn mount(root: impl Into<PathBuf>) -> MemoryResult<Self> {
        let root = root.into();

        let metadata = fs::metadata(&root)
            .await
            .map_err(|e| MemoryError::unavailable(&root, e.to_string()))?;

        if !metadata.is_dir() {
            return Err(MemoryError::unavailable(&root, "not a directory"));
        }

        info!(root = %root.display(), "Storage mounted");
        Ok(Self { root })
    }

    /// Mount point of this device
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a device path under the mount point
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn temp_path(target: &Path) -> PathBuf {
        let mut name = target.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write_synced(target: &Path, path: &str, data: &[u8]) -> MemoryResult<()> {
        let mut file = File::create(target)
            .await
            .map_err(|e| MemoryError::file_open(path, e))?;

        file.write_all(data)
            .await
            .map_err(|e| MemoryError::storage("write", e))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::storage("flush", e))?;
        file.sync_all()
            .await
            .map_err(|e| MemoryError::storage("sync", e))?;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsStorage {
    fn name(&self) -> &str {
        "fs"
    }

    async fn exists(&self, path: &str) -> MemoryResult<bool> {
        fs::try_exists(self.resolve(path))
            .await
            .map_err(|e| MemoryError::storage("exists", e))
    }

    async fn read_lines(&self, path: &str) -> MemoryResult<Option<LineStream>> {
        let file = match File::open(self.resolve(path)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MemoryError::file_open(path, e)),
        };

        let lines = LinesStream::new(BufReader::new(file).lines());
        Ok(Some(lines.boxed()))
    }

    async fn read(&self, path: &str) -> MemoryResult<Option<Vec<u8>>> {
        match fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MemoryError::file_open(path, e)),
        }
    }

    async fn append(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.resolve(path))
            .await
            .map_err(|e| MemoryError::file_open(path, e))?;

        file.write_all(data)
            .await
            .map_err(|e| MemoryError::storage("append", e))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::storage("flush", e))?;

        Ok(())
    }

    async fn write(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        let mut file = File::create(self.resolve(path))
            .await
            .map_err(|e| MemoryError::file_open(path, e))?;

        file.write_all(data)
            .await
            .map_err(|e| MemoryError::storage("write", e))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::storage("flush", e))?;

        Ok(())
    }

    async fn replace(&self, path: &str, data: &[u8]) -> MemoryResult<()> {
        let target = self.resolve(path);
        let temp = Self::temp_path(&target);

        if let Err(e) = Self::write_synced(&temp, path, data).await {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(temp = %temp.display(), error = %cleanup, "Failed to remove temp file");
                }
            }
            return Err(e);
        }

        fs::rename(&temp, &target)
            .await
            .map_err(|e| MemoryError::storage("rename", e))?;

        debug!(path, bytes = data.len(), "Replaced file atomically");
        Ok(())
    }

    async fn remove(&self, path: &str) -> MemoryResult<bool> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MemoryError::storage("remove", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_mount_missing_root_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-card");

        let err = FsStorage::mount(&missing).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_mount_file_root_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("card.img");
        std::fs::write(&file, b"").unwrap();

        let err = FsStorage::mount(&file).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_append_and_read_lines() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::mount(dir.path()).await.unwrap();

        storage.append("/log.txt", b"first\n").await.unwrap();
        storage.append("/log.txt", b"second\r\n").await.unwrap();

        let lines: Vec<String> = storage
            .read_lines("/log.txt")
            .await
            .unwrap()
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, vec!["first", "second"]);
        assert!(dir.path().join("log.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::mount(dir.path()).await.unwrap();

        assert!(!storage.exists("/memory.json").await.unwrap());
        assert!(storage.read("/memory.json").await.unwrap().is_none());
        assert!(storage.read_lines("/memory.txt").await.unwrap().is_none());
        assert!(!storage.remove("/memory.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::mount(dir.path()).await.unwrap();

        storage.write("/memory.json", b"old").await.unwrap();
        storage.replace("/memory.json", b"new").await.unwrap();

        assert_eq!(
            storage.read("/memory.json").await.unwrap().unwrap(),
            b"new".to_vec()
        );
        assert!(!dir.path().join("memory.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::mount(dir.path()).await.unwrap();

        storage.write("/memory.json", b"keep me").await.unwrap();
        // A directory squatting on the temp path makes the temp write fail
        std::fs::create_dir(dir.path().join("memory.json.tmp")).unwrap();

        assert!(storage.replace("/memory.json", b"lost").await.is_err());
        assert_eq!(
            std::fs::read(dir.path().join("memory.json")).unwrap(),
            b"keep me".to_vec()
        );
    }
}
