//! Records kept by the memory store

use serde::{Deserialize, Serialize};

/// Role of the person speaking
pub const ROLE_USER: &str = "user";

/// Role of the assistant replying
pub const ROLE_BOT: &str = "bot";

/// One exchange in the dialogue history
///
/// The role is `"user"` or `"bot"` by convention only; any text is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub role: String,

    /// What was said
    pub message: String,
}

impl ConversationTurn {
    /// Create a turn
    pub fn new(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            message: message.into(),
        }
    }

    /// A turn spoken by the user
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(ROLE_USER, message)
    }

    /// A turn spoken by the assistant
    pub fn bot(message: impl Into<String>) -> Self {
        Self::new(ROLE_BOT, message)
    }
}

/// A remembered fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,
    pub value: String,
}

impl MemoryRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How a load found the backing storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No backing file yet ("no memory yet")
    Missing,

    /// Backing file read successfully
    Loaded,

    /// Backing file was malformed and state was reset
    Recovered {
        /// Device path holding the malformed bytes, if they could be copied
        quarantined: Option<String>,
    },
}

/// Summary of a load, for the boot log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub outcome: LoadOutcome,

    /// Lines (key-value) or turns plus facts (document) seen
    pub entries: usize,
}

impl LoadReport {
    pub fn missing() -> Self {
        Self {
            outcome: LoadOutcome::Missing,
            entries: 0,
        }
    }

    pub fn loaded(entries: usize) -> Self {
        Self {
            outcome: LoadOutcome::Loaded,
            entries,
        }
    }

    /// Whether the store started from nothing
    pub fn is_fresh(&self) -> bool {
        !matches!(self.outcome, LoadOutcome::Loaded)
    }
}
