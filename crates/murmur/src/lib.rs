//! # Murmur - Push-to-talk Voice Assistant
//!
//! **Murmur** ties together the pieces of a small voice assistant:
//!
//! - **Murmur Memory**: facts and dialogue turns persisted on an SD card
//! - **Murmur LLM**: OpenAI-compatible chat completions
//! - **Dialogue**: the listen, ask, record, speak cycle behind a power button
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use murmur::prelude::*;
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(FsStorage::mount("sd").await?);
//!     let memory = open_memory(&MemoryConfig::default(), storage).await?;
//!     let chat = ChatClient::from_env()?;
//!
//!     let mut dialogue = DialogueLoop::new(
//!         memory,
//!         Box::new(chat),
//!         Box::new(ScriptedSpeech::default()),
//!         Box::new(LoggedSpeaker::default()),
//!         Box::new(LogLights::new()),
//!     );
//!     dialogue.press_button(Instant::now());
//!     let outcome = dialogue.step().await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!            murmur (binary + dialogue loop)
//!                   |
//!         +---------+---------+
//!         |                   |
//!   murmur-memory        murmur-llm
//!   (SD card store)      (chat client)
//! ```

#![doc(html_root_url = "https://docs.rs/murmur/0.1.0")]

// Re-export sub-crates
pub use murmur_llm as llm;
pub use murmur_memory as memory;

pub mod config;
pub mod device;
pub mod dialogue;
pub mod speech;

/// Commonly used types and traits
pub mod prelude {
    pub use crate::llm::{ChatClient, ChatCompletion, ChatMessage, ClientConfig, MessageRole};

    pub use crate::memory::memory::{
        open_memory, ConversationMemory, ConversationTurn, MemoryConfig, MemoryFormat,
    };
    pub use crate::memory::storage::{FsStorage, InMemoryStorage, StorageBackend};
    pub use crate::memory::{MemoryError, MemoryResult};

    pub use crate::config::AppConfig;
    pub use crate::device::{Light, LogLights, PowerButton, StatusLights};
    pub use crate::dialogue::{DialogueLoop, DialogueSettings, StepOutcome};
    pub use crate::speech::{LoggedSpeaker, ScriptedSpeech, SpeechInput, SpeechOutput};
}
