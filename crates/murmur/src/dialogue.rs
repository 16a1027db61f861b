//! Dialogue loop: button state, listening, chat and memory

use crate::device::{Light, PowerButton, StatusLights};
use crate::speech::{SpeechInput, SpeechOutput, DEFAULT_WAKE_PHRASE};
use murmur_llm::{ChatCompletion, ChatMessage};
use murmur_memory::memory::{ConversationMemory, ConversationTurn, ROLE_BOT, ROLE_USER};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Dialogue behaviour settings
#[derive(Debug, Clone)]
pub struct DialogueSettings {
    /// Phrase that starts a turn, matched case-insensitively
    pub wake_phrase: String,

    /// How many recorded turns to send along as context (0 sends only the
    /// new utterance)
    pub context_turns: usize,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            context_turns: 0,
        }
    }
}

/// What one pass of the loop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// System is off, nothing happened
    Off,

    /// Something other than the wake phrase (or nothing) was heard
    NoWakeWord { heard: Option<String> },

    /// Wake phrase heard but no utterance followed
    NoSpeech,

    /// Full exchange
    Replied { prompt: String, reply: String },

    /// The chat request failed; only the user turn was recorded
    ChatFailed { prompt: String, error: String },
}

/// The assistant's control loop
///
/// Each [`step`](Self::step) is one pass of the firmware loop: if the system
/// is on, listen for the wake phrase, capture an utterance, record it, ask
/// the chat endpoint, record and speak the reply. Storage failures are logged
/// and the loop carries on.
pub struct DialogueLoop {
    memory: Box<dyn ConversationMemory>,
    chat: Box<dyn ChatCompletion>,
    input: Box<dyn SpeechInput>,
    output: Box<dyn SpeechOutput>,
    lights: Box<dyn StatusLights>,
    button: PowerButton,
    settings: DialogueSettings,
}

impl DialogueLoop {
    /// Assemble a loop from its collaborators
    pub fn new(
        memory: Box<dyn ConversationMemory>,
        chat: Box<dyn ChatCompletion>,
        input: Box<dyn SpeechInput>,
        output: Box<dyn SpeechOutput>,
        lights: Box<dyn StatusLights>,
    ) -> Self {
        Self {
            memory,
            chat,
            input,
            output,
            lights,
            button: PowerButton::default(),
            settings: DialogueSettings::default(),
        }
    }

    /// Replace the power button (e.g. for a different debounce window)
    pub fn with_button(mut self, button: PowerButton) -> Self {
        self.button = button;
        self
    }

    /// Replace the dialogue settings
    pub fn with_settings(mut self, settings: DialogueSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Whether the system is on
    pub fn is_on(&self) -> bool {
        self.button.is_on()
    }

    /// The memory store
    pub fn memory(&self) -> &dyn ConversationMemory {
        self.memory.as_ref()
    }

    /// Handle a button press; returns whether the system is now on
    pub fn press_button(&mut self, at: Instant) -> bool {
        if let Some(on) = self.button.press(at) {
            info!("System turned {}", if on { "ON" } else { "OFF" });
            self.lights.all_off();
        }
        self.button.is_on()
    }

    /// Run one pass of the loop
    pub async fn step(&mut self) -> StepOutcome {
        if !self.button.is_on() {
            return StepOutcome::Off;
        }

        info!("Say the wake word...");
        self.lights.set(Light::Listening, true);

        let heard = self.input.listen_for_wake_word().await;
        if !heard.as_deref().is_some_and(|h| self.is_wake_phrase(h)) {
            self.lights.set(Light::Listening, false);
            return StepOutcome::NoWakeWord { heard };
        }

        info!("Wake word detected. Listening to the user...");
        let utterance = self.input.transcribe().await;
        self.lights.set(Light::Listening, false);

        let Some(prompt) = utterance.filter(|text| !text.trim().is_empty()) else {
            return StepOutcome::NoSpeech;
        };

        let mut messages = self.context().await;
        messages.push(ChatMessage::user(prompt.clone()));
        self.record(ROLE_USER, &prompt).await;

        match self.chat.complete(&messages).await {
            Ok(reply) => {
                info!(reply = %reply, "Response from chat API");
                self.record(ROLE_BOT, &reply).await;

                self.lights.set(Light::Speaking, true);
                self.output.speak(&reply).await;
                self.lights.set(Light::Speaking, false);

                StepOutcome::Replied { prompt, reply }
            }
            Err(e) => {
                error!(error = %e, "Chat request failed");
                StepOutcome::ChatFailed {
                    prompt,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Drive the loop until `shutdown` resolves or button input closes
    ///
    /// Presses made during an exchange apply before the next one. An exchange
    /// under way when `shutdown` fires runs to completion, so no memory write
    /// is cut short.
    pub async fn run<F>(&mut self, presses: &mut mpsc::Receiver<Instant>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            while let Ok(at) = presses.try_recv() {
                self.press_button(at);
            }

            if !self.is_on() {
                tokio::select! {
                    _ = &mut shutdown => break,
                    press = presses.recv() => match press {
                        Some(at) => {
                            self.press_button(at);
                        }
                        None => {
                            info!("Button input closed");
                            break;
                        }
                    },
                }
                continue;
            }

            let mut stopping = false;
            let outcome = {
                let step = self.step();
                tokio::pin!(step);
                tokio::select! {
                    outcome = &mut step => outcome,
                    _ = &mut shutdown => {
                        info!("Finishing the current exchange before shutting down");
                        stopping = true;
                        step.await
                    }
                }
            };

            match outcome {
                StepOutcome::Replied { reply, .. } => info!(reply = %reply, "Exchange complete"),
                StepOutcome::ChatFailed { error, .. } => warn!(error = %error, "No reply this round"),
                other => info!(outcome = ?other, "Nothing to answer"),
            }

            if stopping {
                break;
            }
        }
    }

    fn is_wake_phrase(&self, heard: &str) -> bool {
        heard.trim().eq_ignore_ascii_case(self.settings.wake_phrase.trim())
    }

    async fn record(&mut self, role: &str, message: &str) {
        if let Err(e) = self.memory.record_turn(role, message).await {
            warn!(role, error = %e, "Failed to record conversation turn");
        }
    }

    async fn context(&self) -> Vec<ChatMessage> {
        if self.settings.context_turns == 0 {
            return Vec::new();
        }

        let history = match self.memory.history().await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "Failed to read conversation history");
                return Vec::new();
            }
        };

        let skip = history.len().saturating_sub(self.settings.context_turns);
        history.into_iter().skip(skip).map(to_chat_message).collect()
    }
}

fn to_chat_message(turn: ConversationTurn) -> ChatMessage {
    match turn.role.as_str() {
        ROLE_BOT | "assistant" => ChatMessage::assistant(turn.message),
        "system" => ChatMessage::system(turn.message),
        _ => ChatMessage::user(turn.message),
    }
}
