//! Application configuration
//!
//! Layered as built-in defaults, then an optional `murmur.toml` (or the file
//! given on the command line), then `MURMUR_*` environment variables, with
//! nested keys separated by `__` (e.g. `MURMUR_MEMORY__FORMAT=document`,
//! `MURMUR_LLM__API_KEY=...`). A `.env` file is read first if present.

use crate::device::PowerButton;
use crate::dialogue::DialogueSettings;
use crate::speech::{LoggedSpeaker, ScriptedSpeech, DEFAULT_UTTERANCE, DEFAULT_WAKE_PHRASE};
use config::{Config, ConfigError, Environment, File};
use murmur_llm::{ClientConfig, LlmError, DEFAULT_BASE_URL, DEFAULT_MODEL};
use murmur_memory::memory::MemoryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory mounted as the SD card
    pub storage_root: PathBuf,

    /// Memory store settings
    pub memory: MemoryConfig,

    /// Chat endpoint settings
    pub llm: LlmSettings,

    /// Dialogue and device timing
    pub dialogue: DialogueConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("sd"),
            memory: MemoryConfig::default(),
            llm: LlmSettings::default(),
            dialogue: DialogueConfig::default(),
        }
    }
}

/// Chat endpoint settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API key; falls back to `OPENAI_API_KEY`
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    /// Build the chat client configuration
    pub fn client_config(&self) -> Result<ClientConfig, LlmError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| LlmError::config("no API key (set MURMUR_LLM__API_KEY or OPENAI_API_KEY)"))?;

        let mut config = ClientConfig::new(api_key)
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(prompt) = &self.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        Ok(config)
    }
}

/// Dialogue and device timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub wake_phrase: String,

    /// What the scripted microphone hears after the wake phrase
    pub scripted_utterance: String,

    pub listen_window_ms: u64,
    pub silence_window_ms: u64,
    pub speak_duration_ms: u64,
    pub debounce_ms: u64,

    /// Recorded turns sent along with each request
    pub context_turns: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            scripted_utterance: DEFAULT_UTTERANCE.to_string(),
            listen_window_ms: 5_000,
            silence_window_ms: 4_000,
            speak_duration_ms: 5_000,
            debounce_ms: 200,
            context_turns: 0,
        }
    }
}

impl DialogueConfig {
    pub fn settings(&self) -> DialogueSettings {
        DialogueSettings {
            wake_phrase: self.wake_phrase.clone(),
            context_turns: self.context_turns,
        }
    }

    pub fn button(&self) -> PowerButton {
        PowerButton::new(Duration::from_millis(self.debounce_ms))
    }

    pub fn speech_input(&self) -> ScriptedSpeech {
        ScriptedSpeech::new(self.wake_phrase.clone(), self.scripted_utterance.clone()).with_windows(
            Duration::from_millis(self.listen_window_ms),
            Duration::from_millis(self.silence_window_ms),
        )
    }

    pub fn speech_output(&self) -> LoggedSpeaker {
        LoggedSpeaker::new(Duration::from_millis(self.speak_duration_ms))
    }
}

impl AppConfig {
    /// Load configuration from `file` (or `murmur.toml` if present) and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_sources(file, environment())
    }

    fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("murmur").required(false)),
        };

        let mut config: AppConfig = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        Ok(config)
    }
}

/// `MURMUR_` prefix, `__` between nested keys
fn environment() -> Environment {
    Environment::with_prefix("MURMUR")
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_memory::memory::{Framing, MemoryFormat};

    #[test]
    fn test_defaults_match_firmware() {
        let config = AppConfig::default();
        assert_eq!(config.memory.format, MemoryFormat::KeyValue);
        assert_eq!(config.memory.memory_path, "/memory.txt");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.dialogue.wake_phrase, "hello bot");
        assert_eq!(config.dialogue.debounce_ms, 200);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.toml");
        std::fs::write(
            &path,
            r#"
storage_root = "/media/sd"

[memory]
format = "document"
framing = "raw"

[llm]
api_key = "sk-test"
model = "gpt-4o-mini"

[dialogue]
context_turns = 6
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/media/sd"));
        assert_eq!(config.memory.format, MemoryFormat::Document);
        assert_eq!(config.memory.framing, Framing::Raw);
        assert_eq!(config.memory.document_path, "/memory.json");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.dialogue.context_turns, 6);
        assert_eq!(config.dialogue.listen_window_ms, 5_000);

        let client = tokio_test::assert_ok!(config.llm.client_config());
        assert_eq!(client.api_key, "sk-test");
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let vars: config::Map<String, String> = [
            ("MURMUR_MEMORY__FORMAT", "document"),
            ("MURMUR_LLM__API_KEY", "sk-env"),
            ("MURMUR_STORAGE_ROOT", "/mnt/card"),
            ("OTHER_LLM__MODEL", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::from_sources(None, environment().source(Some(vars))).unwrap();

        assert_eq!(config.memory.format, MemoryFormat::Document);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.storage_root, PathBuf::from("/mnt/card"));
    }

    #[test]
    fn test_missing_api_key_is_a_config_error() {
        let settings = LlmSettings::default();
        let err = tokio_test::assert_err!(settings.client_config());
        assert!(matches!(err, LlmError::Config(_)));
    }
}
