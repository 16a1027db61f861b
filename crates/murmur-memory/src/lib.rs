//! # Murmur Memory
//!
//! On-device conversation memory for a voice assistant. Facts and dialogue
//! turns survive power cycles on a small storage device such as an SD card.
//!
//! - [`storage`]: the block device abstraction and its host/RAM backends
//! - [`memory`]: key-value and JSON document memory stores
//! - [`error`]: error types shared by both
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use murmur_memory::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> MemoryResult<()> {
//! let storage = Arc::new(FsStorage::mount("/media/sd").await?);
//! let mut memory = open_memory(&MemoryConfig::default(), storage).await?;
//!
//! memory.remember_fact("name", "John").await?;
//! assert_eq!(memory.recall_fact("name").await?.as_deref(), Some("John"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod storage;

pub use error::{MemoryError, MemoryResult};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::memory::{
        open_memory, ConversationMemory, ConversationTurn, DocumentMemory, KeyValueMemory,
        MemoryConfig, MemoryFormat,
    };
    pub use crate::storage::{FsStorage, InMemoryStorage, StorageBackend};
}
