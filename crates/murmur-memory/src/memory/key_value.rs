//! Key-value memory backed by two append-only line logs

use super::config::{Framing, MemoryConfig, MemoryFormat};
use super::framing::{decode_record, decode_turn, encode_record, encode_turn};
use super::types::{ConversationTurn, LoadReport};
use super::ConversationMemory;
use crate::error::{MemoryError, MemoryResult};
use crate::storage::{LineStream, StorageBackend};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Facts as `key:value` lines, conversation as `role: message` lines
///
/// Nothing is cached: every recall streams the fact log from the start and
/// stops at the first matching key. Saving a key that already exists appends
/// a second record, which the first one shadows.
pub struct KeyValueMemory {
    /// Storage backend
    storage: Arc<dyn StorageBackend>,

    /// Fact log path
    memory_path: String,

    /// Conversation log path
    conversation_path: String,

    /// Line framing
    framing: Framing,
}

impl KeyValueMemory {
    /// Create a key-value memory over a storage device
    pub fn new(storage: Arc<dyn StorageBackend>, config: &MemoryConfig) -> Self {
        Self {
            storage,
            memory_path: config.memory_path.clone(),
            conversation_path: config.conversation_path.clone(),
            framing: config.framing,
        }
    }

    /// Lazily stream the raw fact lines, `None` if there is no memory yet
    pub async fn lines(&self) -> MemoryResult<Option<LineStream>> {
        self.storage.read_lines(&self.memory_path).await
    }

    /// Read the fact log for the boot log, returning the raw lines
    ///
    /// The lines are not retained; recall always goes back to storage.
    pub async fn load(&self) -> MemoryResult<Vec<String>> {
        let Some(mut lines) = self.lines().await? else {
            info!(path = %self.memory_path, "No memory file found");
            return Ok(Vec::new());
        };

        let mut raw = Vec::new();
        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| MemoryError::storage("load", e))?;
            debug!(line = %line, "Memory");
            raw.push(line);
        }

        info!(path = %self.memory_path, lines = raw.len(), "Memory loaded");
        Ok(raw)
    }

    /// Append a fact without checking for an existing key
    pub async fn save(&self, key: &str, value: &str) -> MemoryResult<()> {
        let line = encode_record(key, value, self.framing)?;
        self.storage
            .append(&self.memory_path, line.as_bytes())
            .await
            .map_err(|e| {
                warn!(key, error = %e, "Failed to open memory file for writing");
                e
            })?;

        debug!(key, "Fact saved");
        Ok(())
    }

    /// Value of the first record with this key
    pub async fn recall(&self, key: &str) -> MemoryResult<Option<String>> {
        let Some(mut lines) = self.lines().await? else {
            return Ok(None);
        };

        while let Some(line) = lines.next().await {
            let line = line.map_err(|e| MemoryError::storage("recall", e))?;
            if let Some((found, value)) = decode_record(&line, self.framing) {
                if found == key {
                    return Ok(Some(value));
                }
            }
        }

        Ok(None)
    }

    /// Append a conversation turn to the conversation log
    pub async fn log_conversation(&self, role: &str, message: &str) -> MemoryResult<()> {
        let line = encode_turn(role, message, self.framing)?;
        self.storage
            .append(&self.conversation_path, line.as_bytes())
            .await
            .map_err(|e| {
                warn!(role, error = %e, "Failed to open conversation file for writing");
                e
            })?;

        debug!(role, "Conversation turn logged");
        Ok(())
    }

    /// Parse the conversation log back into turns, in file order
    pub async fn conversation(&self) -> MemoryResult<Vec<ConversationTurn>> {
        let Some(mut lines) = self.storage.read_lines(&self.conversation_path).await? else {
            return Ok(Vec::new());
        };

        let mut turns = Vec::new();
        let mut line_number = 0usize;
        while let Some(line) = lines.next().await {
            line_number += 1;
            let line = line.map_err(|e| MemoryError::storage("conversation", e))?;
            if line.is_empty() {
                continue;
            }
            match decode_turn(&line, self.framing) {
                Some((role, message)) => turns.push(ConversationTurn::new(role, message)),
                None => warn!(line_number, "Skipping malformed conversation line"),
            }
        }

        Ok(turns)
    }
}

#[async_trait]
impl ConversationMemory for KeyValueMemory {
    fn format(&self) -> MemoryFormat {
        MemoryFormat::KeyValue
    }

    async fn load(&mut self) -> MemoryResult<LoadReport> {
        if !self.storage.exists(&self.memory_path).await? {
            info!(path = %self.memory_path, "No memory file found");
            return Ok(LoadReport::missing());
        }

        let lines = KeyValueMemory::load(self).await?;
        Ok(LoadReport::loaded(lines.len()))
    }

    async fn record_turn(&mut self, role: &str, message: &str) -> MemoryResult<()> {
        self.log_conversation(role, message).await
    }

    async fn history(&self) -> MemoryResult<Vec<ConversationTurn>> {
        self.conversation().await
    }

    async fn remember_fact(&mut self, key: &str, value: &str) -> MemoryResult<()> {
        self.save(key, value).await
    }

    async fn recall_fact(&self, key: &str) -> MemoryResult<Option<String>> {
        self.recall(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn memory(storage: Arc<InMemoryStorage>, framing: Framing) -> KeyValueMemory {
        let config = MemoryConfig::new(MemoryFormat::KeyValue).with_framing(framing);
        KeyValueMemory::new(storage, &config)
    }

    #[tokio::test]
    async fn test_save_and_recall() {
        let storage = Arc::new(InMemoryStorage::new());
        let memory = memory(storage.clone(), Framing::Escaped);

        memory.save("name", "John").await.unwrap();
        memory.save("city", "Lisbon").await.unwrap();

        assert_eq!(memory.recall("name").await.unwrap().as_deref(), Some("John"));
        assert_eq!(memory.recall("city").await.unwrap().as_deref(), Some("Lisbon"));
        assert_eq!(
            storage.contents("/memory.txt").as_deref(),
            Some("name:John\ncity:Lisbon\n")
        );
    }

    #[tokio::test]
    async fn test_first_record_shadows_later_ones() {
        let storage = Arc::new(InMemoryStorage::new());
        let memory = memory(storage, Framing::Raw);

        memory.save("name", "John").await.unwrap();
        memory.save("name", "Jane").await.unwrap();

        assert_eq!(memory.recall("name").await.unwrap().as_deref(), Some("John"));
    }

    #[tokio::test]
    async fn test_recall_does_not_match_key_prefix() {
        let storage = Arc::new(InMemoryStorage::new());
        let memory = memory(storage, Framing::Escaped);

        memory.save("username", "jdoe").await.unwrap();
        assert_eq!(memory.recall("user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_files_mean_no_memory_yet() {
        let storage = Arc::new(InMemoryStorage::new());
        let memory = memory(storage, Framing::Escaped);

        assert!(memory.load().await.unwrap().is_empty());
        assert_eq!(memory.recall("name").await.unwrap(), None);
        assert!(memory.conversation().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_firmware_written_logs() {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_file("/memory.txt", "name:John\r\nalarm:07:30\r\n")
                .with_file("/conversation.txt", "user: My name is John\r\nbot: Hi John!\r\n"),
        );
        let memory = memory(storage, Framing::Raw);

        assert_eq!(memory.load().await.unwrap(), vec!["name:John", "alarm:07:30"]);
        assert_eq!(memory.recall("alarm").await.unwrap().as_deref(), Some("07:30"));
        assert_eq!(
            memory.conversation().await.unwrap(),
            vec![
                ConversationTurn::user("My name is John"),
                ConversationTurn::bot("Hi John!"),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut memory = memory(storage.clone(), Framing::Escaped);
        storage.set_read_only(true);

        let err = memory.record_turn("user", "hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::FileOpen { .. }));

        let err = memory.remember_fact("name", "John").await.unwrap_err();
        assert!(matches!(err, MemoryError::FileOpen { .. }));
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn test_multiline_message_round_trips() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut memory = memory(storage, Framing::Escaped);

        memory
            .record_turn("bot", "Step 1: boil water\nStep 2: add tea")
            .await
            .unwrap();

        let history = memory.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "Step 1: boil water\nStep 2: add tea");
    }
}
