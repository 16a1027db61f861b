//! Speech input and output
//!
//! There is no audio capture, wake-word model, speech-to-text or
//! text-to-speech here. The traits mark where those would plug in; the stubs
//! wait a fixed time and produce or swallow fixed text.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Wake phrase the scripted microphone "hears"
pub const DEFAULT_WAKE_PHRASE: &str = "hello bot";

/// Utterance the scripted microphone "hears" after the wake phrase
pub const DEFAULT_UTTERANCE: &str = "My name is John";

/// Source of recognized speech
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Listen for a wake phrase; `None` if nothing was heard
    async fn listen_for_wake_word(&mut self) -> Option<String>;

    /// Capture one utterance after the wake phrase and return its text
    async fn transcribe(&mut self) -> Option<String>;
}

/// Sink for replies
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Say `text`, returning once speech has finished
    async fn speak(&mut self, text: &str);
}

/// Microphone stand-in that always hears the same script
#[derive(Debug, Clone)]
pub struct ScriptedSpeech {
    wake_phrase: String,
    utterance: String,
    listen_window: Duration,
    silence_window: Duration,
}

impl ScriptedSpeech {
    /// Create a script
    pub fn new(wake_phrase: impl Into<String>, utterance: impl Into<String>) -> Self {
        Self {
            wake_phrase: wake_phrase.into(),
            utterance: utterance.into(),
            listen_window: Duration::from_secs(5),
            silence_window: Duration::from_secs(4),
        }
    }

    /// Set how long to wait for the wake phrase and for trailing silence
    pub fn with_windows(mut self, listen: Duration, silence: Duration) -> Self {
        self.listen_window = listen;
        self.silence_window = silence;
        self
    }
}

impl Default for ScriptedSpeech {
    fn default() -> Self {
        Self::new(DEFAULT_WAKE_PHRASE, DEFAULT_UTTERANCE)
    }
}

#[async_trait]
impl SpeechInput for ScriptedSpeech {
    async fn listen_for_wake_word(&mut self) -> Option<String> {
        tokio::time::sleep(self.listen_window).await;
        Some(self.wake_phrase.clone())
    }

    async fn transcribe(&mut self) -> Option<String> {
        tokio::time::sleep(self.silence_window).await;
        Some(self.utterance.clone())
    }
}

/// Speaker stand-in that logs the text and holds for a fixed duration
#[derive(Debug, Clone)]
pub struct LoggedSpeaker {
    duration: Duration,
}

impl LoggedSpeaker {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for LoggedSpeaker {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl SpeechOutput for LoggedSpeaker {
    async fn speak(&mut self, text: &str) {
        info!(text, "Speaking");
        tokio::time::sleep(self.duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_speech_follows_script() {
        let mut speech = ScriptedSpeech::new("hey murmur", "what time is it")
            .with_windows(Duration::ZERO, Duration::ZERO);

        assert_eq!(speech.listen_for_wake_word().await.as_deref(), Some("hey murmur"));
        assert_eq!(speech.transcribe().await.as_deref(), Some("what time is it"));
    }
}
