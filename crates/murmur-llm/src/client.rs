//! Chat completion client

use crate::config::ClientConfig;
use crate::error::{LlmError, LlmResult};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Anything that can answer a conversation with one reply
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send a full conversation and return the reply text
    async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String>;

    /// Send a single user prompt and return the reply text
    async fn send_chat_request(&self, prompt: &str) -> LlmResult<String> {
        self.complete(&[ChatMessage::user(prompt)]).await
    }
}

/// HTTP client for an OpenAI-compatible chat completions endpoint
///
/// Requests are sent once; there is no retry.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ChatClient {
    /// Create a client
    pub fn new(config: ClientConfig) -> LlmResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::config("API key is empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    /// Create a client from `OPENAI_*` environment variables
    pub fn from_env() -> LlmResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn with_system_prompt(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        if let Some(prompt) = &self.config.system_prompt {
            all.push(ChatMessage::system(prompt.clone()));
        }
        all.extend_from_slice(messages);
        all
    }
}

#[async_trait]
impl ChatCompletion for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        let messages = self.with_system_prompt(messages);
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
        };

        debug!(model = %self.config.model, messages = messages.len(), "Sending chat request");

        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Error in chat API request");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        info!(reply_len = reply.len(), "Received chat reply");
        Ok(reply)
    }
}
