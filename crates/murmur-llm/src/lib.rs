//! # Murmur LLM
//!
//! Minimal client for OpenAI-compatible chat completions, used by the voice
//! assistant to turn a transcribed utterance into a reply.
//!
//! ```rust,no_run
//! use murmur_llm::{ChatClient, ChatCompletion, ClientConfig};
//!
//! # async fn example() -> murmur_llm::LlmResult<()> {
//! let client = ChatClient::new(ClientConfig::new("sk-..."))?;
//! let reply = client.send_chat_request("My name is John").await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{ChatClient, ChatCompletion};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{LlmError, LlmResult};
pub use types::{ChatMessage, MessageRole};
