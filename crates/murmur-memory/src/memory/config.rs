//! Memory store configuration

use serde::{Deserialize, Serialize};

/// Default key-value fact log
pub const DEFAULT_MEMORY_PATH: &str = "/memory.txt";

/// Default key-value conversation log
pub const DEFAULT_CONVERSATION_PATH: &str = "/conversation.txt";

/// Default structured document
pub const DEFAULT_DOCUMENT_PATH: &str = "/memory.json";

/// On-disk representation, one per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryFormat {
    /// `key:value` and `role: message` line logs
    #[default]
    KeyValue,

    /// Single JSON document
    Document,
}

/// Line framing for the key-value logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Backslash escapes for newlines, backslashes and key colons
    #[default]
    Escaped,

    /// Verbatim lines as the firmware wrote them; unframeable input is rejected
    Raw,
}

/// How the structured document reaches storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Truncate and rewrite in place
    Rewrite,

    /// Write a temp file, sync, then rename over the document
    #[default]
    AtomicReplace,
}

/// What to do when the structured document does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseRecovery {
    /// Copy the raw bytes aside, then start from an empty document
    #[default]
    Quarantine,

    /// Return the parse error and leave the in-memory document unchanged
    Reject,
}

/// Configuration for the memory store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Which backend to use
    pub format: MemoryFormat,

    /// Line framing (key-value backend)
    pub framing: Framing,

    /// Save strategy (document backend)
    pub write_strategy: WriteStrategy,

    /// Parse failure policy (document backend)
    pub parse_recovery: ParseRecovery,

    /// Fact log path (key-value backend)
    pub memory_path: String,

    /// Conversation log path (key-value backend)
    pub conversation_path: String,

    /// Document path (document backend)
    pub document_path: String,
}

impl MemoryConfig {
    /// Create a configuration for the given format
    pub fn new(format: MemoryFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Set line framing
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the document save strategy
    pub fn with_write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.write_strategy = strategy;
        self
    }

    /// Set the parse failure policy
    pub fn with_parse_recovery(mut self, recovery: ParseRecovery) -> Self {
        self.parse_recovery = recovery;
        self
    }

    /// Set the fact log path
    pub fn with_memory_path(mut self, path: impl Into<String>) -> Self {
        self.memory_path = path.into();
        self
    }

    /// Set the conversation log path
    pub fn with_conversation_path(mut self, path: impl Into<String>) -> Self {
        self.conversation_path = path.into();
        self
    }

    /// Set the document path
    pub fn with_document_path(mut self, path: impl Into<String>) -> Self {
        self.document_path = path.into();
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            format: MemoryFormat::default(),
            framing: Framing::default(),
            write_strategy: WriteStrategy::default(),
            parse_recovery: ParseRecovery::default(),
            memory_path: DEFAULT_MEMORY_PATH.to_string(),
            conversation_path: DEFAULT_CONVERSATION_PATH.to_string(),
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
        }
    }
}
