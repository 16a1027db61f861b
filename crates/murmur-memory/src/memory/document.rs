//! Structured memory kept as one JSON document

use super::config::{MemoryConfig, MemoryFormat, ParseRecovery, WriteStrategy};
use super::types::{ConversationTurn, LoadOutcome, LoadReport, MemoryRecord};
use super::ConversationMemory;
use crate::error::{MemoryError, MemoryResult};
use crate::storage::StorageBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The persisted document
///
/// Serializes as `{"conversation": [{"role": .., "message": ..}, ..]}`. Facts
/// are only written once there is at least one, and unknown top-level fields
/// are carried through load and save untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Dialogue history in insertion order
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,

    /// Remembered facts in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<MemoryRecord>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MemoryDocument {
    /// Value of the first fact with this key
    pub fn recall(&self, key: &str) -> Option<&str> {
        self.facts
            .iter()
            .find(|fact| fact.key == key)
            .map(|fact| fact.value.as_str())
    }

    /// Number of turns plus facts
    pub fn len(&self) -> usize {
        self.conversation.len() + self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory held in RAM and synced to a single backing document
///
/// Every append rewrites the whole document, so the cost of a turn grows with
/// the history.
pub struct DocumentMemory {
    /// Storage backend
    storage: Arc<dyn StorageBackend>,

    /// Document path
    path: String,

    /// In-memory document
    document: MemoryDocument,

    write_strategy: WriteStrategy,
    parse_recovery: ParseRecovery,
}

impl DocumentMemory {
    /// Create an empty document memory over a storage device
    pub fn new(storage: Arc<dyn StorageBackend>, config: &MemoryConfig) -> Self {
        Self {
            storage,
            path: config.document_path.clone(),
            document: MemoryDocument::default(),
            write_strategy: config.write_strategy,
            parse_recovery: config.parse_recovery,
        }
    }

    /// Current in-memory document
    pub fn document(&self) -> &MemoryDocument {
        &self.document
    }

    /// Replace the in-memory document with the one on storage
    ///
    /// A missing file resets to an empty document. A malformed file is handled
    /// by the configured [`ParseRecovery`].
    pub async fn load(&mut self) -> MemoryResult<LoadReport> {
        let Some(bytes) = self.storage.read(&self.path).await? else {
            info!(path = %self.path, "No memory file found. Starting fresh");
            self.document = MemoryDocument::default();
            return Ok(LoadReport::missing());
        };

        match serde_json::from_slice::<MemoryDocument>(&bytes) {
            Ok(document) => {
                self.document = document;
                info!(
                    path = %self.path,
                    turns = self.document.conversation.len(),
                    facts = self.document.facts.len(),
                    "Memory loaded"
                );
                Ok(LoadReport::loaded(self.document.len()))
            }
            Err(source) => {
                let error = MemoryError::Parse {
                    path: self.path.clone(),
                    source,
                };

                match self.parse_recovery {
                    ParseRecovery::Reject => {
                        warn!(error = %error, "Failed to parse memory document");
                        Err(error)
                    }
                    ParseRecovery::Quarantine => {
                        warn!(error = %error, "Failed to parse memory document, starting fresh");
                        self.document = MemoryDocument::default();
                        let quarantined = self.quarantine(&bytes).await;
                        Ok(LoadReport {
                            outcome: LoadOutcome::Recovered { quarantined },
                            entries: 0,
                        })
                    }
                }
            }
        }
    }

    /// Serialize the whole document to storage
    pub async fn save(&self) -> MemoryResult<()> {
        let bytes = serde_json::to_vec(&self.document).map_err(MemoryError::Serialize)?;

        let result = match self.write_strategy {
            WriteStrategy::Rewrite => self.storage.write(&self.path, &bytes).await,
            WriteStrategy::AtomicReplace => self.storage.replace(&self.path, &bytes).await,
        };

        match result {
            Ok(()) => {
                debug!(path = %self.path, bytes = bytes.len(), "Memory saved");
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "Failed to save memory document");
                Err(e)
            }
        }
    }

    /// Append a turn and save
    ///
    /// If the save fails the turn stays in memory; the next successful save
    /// persists it.
    pub async fn append_turn(&mut self, role: &str, message: &str) -> MemoryResult<()> {
        self.document
            .conversation
            .push(ConversationTurn::new(role, message));
        self.save().await
    }

    /// Append a fact and save
    pub async fn append_fact(&mut self, key: &str, value: &str) -> MemoryResult<()> {
        self.document.facts.push(MemoryRecord::new(key, value));
        self.save().await
    }

    /// Copy malformed bytes aside and overwrite the original with the reset
    /// document. Failures only cost the copy; the reset stands either way.
    async fn quarantine(&self, bytes: &[u8]) -> Option<String> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let target = format!("{}.corrupt-{}", self.path, stamp);

        if let Err(e) = self.storage.write(&target, bytes).await {
            warn!(path = %target, error = %e, "Failed to copy malformed memory aside");
            return None;
        }
        info!(path = %target, "Malformed memory copied aside");

        // Otherwise every later load would copy the same bytes again.
        if self.save().await.is_err() {
            debug!(path = %self.path, "Malformed memory file left in place");
        }
        Some(target)
    }
}

#[async_trait]
impl ConversationMemory for DocumentMemory {
    fn format(&self) -> MemoryFormat {
        MemoryFormat::Document
    }

    async fn load(&mut self) -> MemoryResult<LoadReport> {
        DocumentMemory::load(self).await
    }

    async fn record_turn(&mut self, role: &str, message: &str) -> MemoryResult<()> {
        self.append_turn(role, message).await
    }

    async fn history(&self) -> MemoryResult<Vec<ConversationTurn>> {
        Ok(self.document.conversation.clone())
    }

    async fn remember_fact(&mut self, key: &str, value: &str) -> MemoryResult<()> {
        self.append_fact(key, value).await
    }

    async fn recall_fact(&self, key: &str) -> MemoryResult<Option<String>> {
        Ok(self.document.recall(key).map(str::to_string))
    }
}
