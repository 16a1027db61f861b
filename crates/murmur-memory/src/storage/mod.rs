//! # Storage Backends
//!
//! The memory store never touches a file handle directly. Every operation goes
//! through a [`StorageBackend`], which opens the named file, performs one
//! operation and releases the handle before returning.
//!
//! Paths are device paths in the firmware's style (`/memory.txt`), resolved by
//! each backend against its own root.
//!
//! - [`FsStorage`]: a host directory standing in for the SD card
//! - [`InMemoryStorage`]: map-backed device for tests and demos

mod fs;
mod in_memory;

pub use fs::FsStorage;
pub use in_memory::InMemoryStorage;

use crate::error::MemoryResult;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy sequence of lines read from a backing file, newline terminators stripped
pub type LineStream = BoxStream<'static, std::io::Result<String>>;

/// A mountable block device exposing named files
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Whether a file exists at `path`
    async fn exists(&self, path: &str) -> MemoryResult<bool>;

    /// Open `path` for reading and stream its lines
    ///
    /// Returns `Ok(None)` when the file does not exist. The handle is released
    /// when the stream is dropped, so a caller may stop early.
    async fn read_lines(&self, path: &str) -> MemoryResult<Option<LineStream>>;

    /// Read a whole file, `Ok(None)` when it does not exist
    async fn read(&self, path: &str) -> MemoryResult<Option<Vec<u8>>>;

    /// Append bytes, creating the file if needed
    async fn append(&self, path: &str, data: &[u8]) -> MemoryResult<()>;

    /// Truncate and overwrite in place
    async fn write(&self, path: &str, data: &[u8]) -> MemoryResult<()>;

    /// Replace the file contents atomically
    ///
    /// Either the new contents are fully visible afterwards or the previous
    /// contents are left untouched.
    async fn replace(&self, path: &str, data: &[u8]) -> MemoryResult<()>;

    /// Delete a file, returning whether it existed
    async fn remove(&self, path: &str) -> MemoryResult<bool>;
}
