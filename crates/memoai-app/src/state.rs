//! Observable application state types.
//!
//! These are the slices the UI reads besides the chat log: model and voice
//! configuration, transcription settings, notifications. The chat log itself
//! lives in [`memoai_core::MessageStore`].

use chrono::{DateTime, Utc};
use memoai_client::NotificationLevel;
use serde::{Deserialize, Serialize};

/// A model known to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Whether the model is loaded into memory.
    pub loaded: bool,
    /// Human readable name (`general.name`).
    pub name: Option<String>,
    /// Architecture, e.g. `llama` (`general.architecture`).
    pub architecture: Option<String>,
    /// Parameter count label, e.g. `8B` (`general.size_label`).
    pub size_label: Option<String>,
    /// Path of the model file on the backend.
    pub path: Option<String>,
    /// Context window the model was loaded with.
    pub n_ctx: Option<u32>,
    /// Layers offloaded to the GPU.
    pub n_gpu_layers: Option<u32>,
}

impl ModelInfo {
    /// Name to show, falling back to the file path.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.path.as_deref()).unwrap_or("unknown model")
    }
}

/// Generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Context window size in tokens.
    pub context_size: u32,
    /// Maximum answer length in tokens.
    pub output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Repetition penalty.
    pub repeat_penalty: f32,
    /// Offload layers to the GPU.
    pub use_gpu: bool,
    /// Ask for streamed answers.
    pub streaming: bool,
    /// Delay between streamed chunks, in milliseconds.
    pub streaming_speed: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            context_size: 2048,
            output_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
            repeat_penalty: 1.05,
            use_gpu: false,
            streaming: true,
            streaming_speed: 100,
        }
    }
}

/// Speech synthesis settings. Persisted across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice model language.
    pub voice_id: String,
    /// Playback rate multiplier.
    pub speech_rate: f32,
    /// Speaker name.
    pub voice_speaker: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self { voice_id: "ru".to_string(), speech_rate: 1.0, voice_speaker: "baya".to_string() }
    }
}

/// Speech recognition engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionEngine {
    /// WhisperX.
    #[default]
    WhisperX,
    /// Vosk.
    Vosk,
}

/// Speech recognition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Engine to use.
    pub engine: TranscriptionEngine,
    /// Expected language.
    pub language: String,
    /// Let the engine detect the language.
    pub auto_detect: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            engine: TranscriptionEngine::WhisperX,
            language: "ru".to_string(),
            auto_detect: true,
        }
    }
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic per app.
    pub id: u64,
    /// Severity.
    pub level: NotificationLevel,
    /// Text.
    pub message: String,
    /// When it was raised.
    pub timestamp: DateTime<Utc>,
}

/// Session statistics shown in the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Messages in the log.
    pub total_messages: usize,
    /// Estimated tokens in the log.
    pub total_tokens: usize,
    /// Sessions started today, as reported by the backend.
    pub sessions_today: u32,
}
