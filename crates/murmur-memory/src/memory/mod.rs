//! # Conversation Memory
//!
//! Persistent memory for the assistant, in one of two on-disk formats chosen
//! per deployment:
//!
//! - **Key-value**: `/memory.txt` holds `key:value` lines, `/conversation.txt`
//!   holds `role: message` lines. Both are append-only.
//! - **Document**: `/memory.json` holds
//!   `{"conversation": [{"role": .., "message": ..}, ..]}`, rewritten on every
//!   change.
//!
//! Both implement [`ConversationMemory`], which is all the dialogue loop sees.
//!
//! ## Example
//!
//! ```rust,no_run
//! use murmur_memory::memory::{open_memory, MemoryConfig, MemoryFormat};
//! use murmur_memory::storage::FsStorage;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(FsStorage::mount("/media/sd").await?);
//! let config = MemoryConfig::new(MemoryFormat::Document);
//!
//! let mut memory = open_memory(&config, storage).await?;
//! memory.record_turn("user", "My name is John").await?;
//! memory.record_turn("bot", "Nice to meet you, John!").await?;
//!
//! for turn in memory.history().await? {
//!     println!("{}: {}", turn.role, turn.message);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod document;
mod framing;
mod key_value;
mod types;

pub use config::{
    Framing, MemoryConfig, MemoryFormat, ParseRecovery, WriteStrategy, DEFAULT_CONVERSATION_PATH,
    DEFAULT_DOCUMENT_PATH, DEFAULT_MEMORY_PATH,
};
pub use document::{DocumentMemory, MemoryDocument};
pub use key_value::KeyValueMemory;
pub use types::{ConversationTurn, LoadOutcome, LoadReport, MemoryRecord, ROLE_BOT, ROLE_USER};

use crate::error::MemoryResult;
use crate::storage::StorageBackend;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Contract shared by both memory backends
///
/// Mutating operations take `&mut self`: the store has exactly one writer and
/// each call finishes before the next one starts.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Which on-disk format backs this memory
    fn format(&self) -> MemoryFormat;

    /// Read backing storage; a missing file is "no memory yet", not an error
    async fn load(&mut self) -> MemoryResult<LoadReport>;

    /// Append one dialogue turn and persist it
    async fn record_turn(&mut self, role: &str, message: &str) -> MemoryResult<()>;

    /// All recorded turns in insertion order
    async fn history(&self) -> MemoryResult<Vec<ConversationTurn>>;

    /// Persist a fact; an existing key is shadowed, not replaced
    async fn remember_fact(&mut self, key: &str, value: &str) -> MemoryResult<()>;

    /// Value of the first fact stored under `key`
    async fn recall_fact(&self, key: &str) -> MemoryResult<Option<String>>;
}

/// Build the configured backend over `storage` and load it
pub async fn open_memory(
    config: &MemoryConfig,
    storage: Arc<dyn StorageBackend>,
) -> MemoryResult<Box<dyn ConversationMemory>> {
    let backend = storage.name().to_string();

    let mut memory: Box<dyn ConversationMemory> = match config.format {
        MemoryFormat::KeyValue => Box::new(KeyValueMemory::new(storage, config)),
        MemoryFormat::Document => Box::new(DocumentMemory::new(storage, config)),
    };

    let report = memory.load().await?;
    info!(
        format = ?config.format,
        storage = %backend,
        outcome = ?report.outcome,
        entries = report.entries,
        "Memory opened"
    );

    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn test_open_memory_picks_backend() {
        let storage = Arc::new(InMemoryStorage::new());

        let kv = open_memory(&MemoryConfig::new(MemoryFormat::KeyValue), storage.clone())
            .await
            .unwrap();
        assert_eq!(kv.format(), MemoryFormat::KeyValue);

        let doc = open_memory(&MemoryConfig::new(MemoryFormat::Document), storage)
            .await
            .unwrap();
        assert_eq!(doc.format(), MemoryFormat::Document);
    }

    #[tokio::test]
    async fn test_open_memory_surfaces_rejected_document() {
        let storage = Arc::new(InMemoryStorage::new().with_file("/memory.json", "[1, 2"));
        let config =
            MemoryConfig::new(MemoryFormat::Document).with_parse_recovery(ParseRecovery::Reject);

        let result = open_memory(&config, storage).await;
        assert!(matches!(result, Err(crate::error::MemoryError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_open_memory_boots_over_corrupt_read_only_document() {
        let storage = Arc::new(InMemoryStorage::new().with_file("/memory.json", "{\"conversation\": ["));
        storage.set_read_only(true);

        let memory = open_memory(&MemoryConfig::new(MemoryFormat::Document), storage)
            .await
            .unwrap();
        assert!(memory.history().await.unwrap().is_empty());
    }
}
