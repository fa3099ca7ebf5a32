//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the
//! controller, the recognition adapters and the chat consumer.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// WakeConfig
// ---------------------------------------------------------------------------

/// Wake / sleep phrase lists and the inactivity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Accepted spellings of the wake phrase.  A transcript wakes the
    /// controller when it contains any of these (case-insensitive).
    ///
    /// Several spellings are listed because transcription of short names is
    /// noisy ("joy", "joey", "joi").
    pub phrases: Vec<String>,
    /// Phrases that send the controller back to sleep when heard during
    /// command capture.
    pub sleep_phrases: Vec<String>,
    /// Seconds of inactivity while awake before going back to sleep.
    pub sleep_timeout_secs: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: vec![
                "hey joy".into(),
                "hey, joy".into(),
                "hi joy".into(),
                "hey joey".into(),
                "hey joi".into(),
            ],
            sleep_phrases: vec!["sleep".into()],
            sleep_timeout_secs: 30,
        }
    }
}

impl WakeConfig {
    pub fn sleep_timeout(&self) -> Duration {
        Duration::from_secs(self.sleep_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Settings passed to the continuous speech-recognition engine, plus the
/// retry policy for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// BCP-47 language tag (e.g. `"en-US"`).
    pub language: String,
    /// Request interim (partial) transcripts while listening for the wake
    /// phrase.  Command capture always uses final results only.
    pub interim_results: bool,
    /// Consecutive recoverable failures tolerated before giving up.
    pub max_retries: u32,
    /// Base delay before restarting after a `no-speech` error.
    pub no_speech_backoff_ms: u64,
    /// Base delay before restarting after a `network` error.
    pub network_backoff_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            interim_results: true,
            max_retries: 2,
            no_speech_backoff_ms: 1_000,
            network_backoff_ms: 3_000,
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackConfig
// ---------------------------------------------------------------------------

/// Spoken and visual feedback emitted on state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Speak the wake acknowledgement through speech synthesis (in addition
    /// to the visual notification).
    pub speak_acknowledgement: bool,
    pub acknowledgement: String,
    pub going_to_sleep: String,
    pub permission_required: String,
    pub unsupported: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            speak_acknowledgement: true,
            acknowledgement: "Yes? I'm listening.".into(),
            going_to_sleep: "Going to sleep. Say \"Hey Joy\" to wake me up.".into(),
            permission_required: "Microphone access is required for voice activation.".into(),
            unsupported: "Speech recognition is not supported on this system.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Downstream conversational service that receives captured commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Forward captured commands at all.  When disabled, transcripts are
    /// only logged.
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key: `None` for local providers.
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// System prompt prepended to every request.
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:3b".into(),
            temperature: 0.3,
            timeout_secs: 15,
            system_prompt: "You are Joy, a concise voice assistant for a sales outreach \
                            dashboard. Answer in one or two short sentences."
                .into(),
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Starts a single-shot command capture while awake (e.g. `"F9"`).
    pub capture_key: String,
    /// Sends the controller to sleep immediately.
    pub sleep_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            capture_key: "F9".into(),
            sleep_key: "F10".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use wake_session::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(!config.wake.phrases.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wake: WakeConfig,
    pub recognition: RecognitionConfig,
    pub feedback: FeedbackConfig,
    pub chat: ChatConfig,
    pub hotkey: HotkeyConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but writes the defaults out on first run
    /// so the user has a file to edit.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&AppPaths::new().settings_file)
    }

    pub fn load_or_create_at(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }
        let config = Self::default();
        config.save_to(path)?;
        log::info!("wrote default settings to {}", path.display());
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
