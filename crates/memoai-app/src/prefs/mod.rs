//! Persisted user preferences.
//!
//! A handful of settings survive restarts: dark mode and the voice settings.
//! They are kept as string values under fixed keys in a [`PreferenceStore`];
//! [`Preferences`] converts between those strings and typed values.
//!
//! Unreadable values are not fatal. A key that is missing or fails to parse
//! falls back to its default so a corrupt entry never blocks startup.

mod error;
mod memory;
mod redb;

pub use error::PreferenceError;
pub use memory::MemoryPreferenceStore;

pub use self::redb::RedbPreferenceStore;
use crate::state::VoiceSettings;

/// Dark mode flag, JSON boolean.
pub const DARK_MODE_KEY: &str = "memoai-dark-mode";
/// Speaker name.
pub const VOICE_SPEAKER_KEY: &str = "voice_speaker";
/// Voice model language.
pub const VOICE_ID_KEY: &str = "voice_id";
/// Playback rate, decimal.
pub const SPEECH_RATE_KEY: &str = "speech_rate";

/// String key-value storage for preferences.
///
/// Synchronous like the rest of the state layer. Implementations share their
/// state through `Arc`, so clones see the same values.
pub trait PreferenceStore: Clone + Send + Sync + 'static {
    /// Value stored under `key`. `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Settings restored at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    /// Dark colour scheme.
    pub dark_mode: bool,
    /// Speech synthesis settings.
    pub voice: VoiceSettings,
}

impl Preferences {
    /// Read preferences from `store`, defaulting every missing or invalid
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::Io` if the store itself cannot be read.
    pub fn load<S: PreferenceStore>(store: &S) -> Result<Self, PreferenceError> {
        let defaults = Self::default();

        let dark_mode = store
            .get(DARK_MODE_KEY)?
            .and_then(|raw| parse_or_warn(DARK_MODE_KEY, &raw, |s| serde_json::from_str(s).ok()))
            .unwrap_or(defaults.dark_mode);

        let voice_speaker = store
            .get(VOICE_SPEAKER_KEY)?
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.voice.voice_speaker);

        let voice_id =
            store.get(VOICE_ID_KEY)?.filter(|s| !s.is_empty()).unwrap_or(defaults.voice.voice_id);

        let speech_rate = store
            .get(SPEECH_RATE_KEY)?
            .and_then(|raw| parse_or_warn(SPEECH_RATE_KEY, &raw, parse_rate))
            .unwrap_or(defaults.voice.speech_rate);

        Ok(Self { dark_mode, voice: VoiceSettings { voice_id, speech_rate, voice_speaker } })
    }

    /// Write every preference to `store`.
    ///
    /// # Errors
    ///
    /// Returns the first error the store reports.
    pub fn save<S: PreferenceStore>(&self, store: &S) -> Result<(), PreferenceError> {
        let dark_mode = serde_json::to_string(&self.dark_mode)
            .map_err(|e| PreferenceError::Serialization(e.to_string()))?;

        store.set(DARK_MODE_KEY, &dark_mode)?;
        store.set(VOICE_SPEAKER_KEY, &self.voice.voice_speaker)?;
        store.set(VOICE_ID_KEY, &self.voice.voice_id)?;
        store.set(SPEECH_RATE_KEY, &self.voice.speech_rate.to_string())?;
        Ok(())
    }
}

/// Positive finite rate.
fn parse_rate(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|rate| rate.is_finite() && *rate > 0.0)
}

fn parse_or_warn<T>(key: &str, raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        tracing::warn!(key, value = raw, "ignoring unreadable preference");
    }
    parsed
}
