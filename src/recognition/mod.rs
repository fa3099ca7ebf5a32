//! Continuous speech-recognition sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    SessionManager                       │
//! │   current: Option<Session>   (never more than one)      │
//! │                                                         │
//! │   start_listening(mode) ──stop()──▶ engine.abort(old)   │
//! │                         └─────────▶ engine.start(new)   │
//! └──────────────────────────────┬─────────────────────────┘
//!                                │ ControllerEvent::Recognition
//!                                ▼ { session, event }
//!                         WakeController::dispatch
//! ```
//!
//! Engines deliver [`RecognitionEvent`]s tagged with the [`SessionId`] they
//! were started with.  The controller compares the tag against the current
//! session and drops anything from an aborted session.

pub mod console;
pub mod engine;
pub mod session;

pub use console::ConsoleRecognizer;
pub use engine::{RecognitionEngine, StartError};
pub use session::{RetryDecision, RetryPolicy, Session, SessionManager, SessionPhase};

#[cfg(test)]
pub use engine::{EngineCall, MockRecognitionEngine};

use std::fmt;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Tag attached to every engine start.  Unique for the controller lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RecognitionMode
// ---------------------------------------------------------------------------

/// What a session is listening for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Continuous, interim results, restarted whenever the engine ends.
    WakePhrase,
    /// Single-shot, final result only, never restarted.
    Command,
}

/// Engine settings for one start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: RecognitionMode,
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

// ---------------------------------------------------------------------------
// RecognitionEvent
// ---------------------------------------------------------------------------

/// Callbacks from the recognition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result { text: String, is_final: bool },
    Error(RecognitionErrorKind),
    /// The engine stopped on its own (not through `abort`).
    Ended,
}

// ---------------------------------------------------------------------------
// RecognitionErrorKind
// ---------------------------------------------------------------------------

/// Error codes reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone permission revoked mid-session.
    NotAllowed,
    /// Silence for too long.
    NoSpeech,
    /// The recognition service could not be reached.
    Network,
    /// Audio capture failed.
    AudioCapture,
    /// The session was aborted by the engine itself.
    Aborted,
    Other(String),
}

impl RecognitionErrorKind {
    /// Map an engine error code (`"no-speech"`, `"network"`, …).
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NotAllowed => "not-allowed",
            Self::NoSpeech => "no-speech",
            Self::Network => "network",
            Self::AudioCapture => "audio-capture",
            Self::Aborted => "aborted",
            Self::Other(code) => code,
        }
    }

    /// Transient failures that consume the retry budget.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoSpeech | Self::Network)
    }
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
