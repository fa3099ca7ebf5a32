//! Fire-and-forget feedback on state transitions.
//!
//! The controller never waits on feedback.  [`Feedback`] turns transitions
//! into spoken phrases ([`SpeechSynthesizer`]) and status strings
//! ([`NotificationSink`]); the texts come from
//! [`FeedbackConfig`](crate::config::FeedbackConfig).
//!
//! Synthesizers report playback through `SpeechStarted` / `SpeechEnded`
//! controller events, which count as activity while awake.

pub mod console;

pub use console::{LogNotifier, LogSynthesizer};

use std::sync::Arc;

use crate::config::FeedbackConfig;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Speech-synthesis service.
pub trait SpeechSynthesizer: Send + Sync {
    /// Queue `text` for playback and return immediately.
    fn speak(&self, text: &str);

    /// Stop any playback in progress.
    fn cancel(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Toast / status line sink.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Feedback {
    synth: Arc<dyn SpeechSynthesizer>,
    notifier: Arc<dyn NotificationSink>,
    messages: FeedbackConfig,
}

impl Feedback {
    pub fn new(
        synth: Arc<dyn SpeechSynthesizer>,
        notifier: Arc<dyn NotificationSink>,
        messages: FeedbackConfig,
    ) -> Self {
        Self {
            synth,
            notifier,
            messages,
        }
    }

    pub fn wake_acknowledged(&self) {
        self.notifier
            .notify(NotificationLevel::Info, &self.messages.acknowledgement);
        if self.messages.speak_acknowledgement {
            self.synth.speak(&self.messages.acknowledgement);
        }
    }

    pub fn going_to_sleep(&self) {
        self.synth.cancel();
        self.notifier
            .notify(NotificationLevel::Info, &self.messages.going_to_sleep);
    }

    pub fn permission_required(&self, detail: Option<&str>) {
        let message = match detail {
            Some(detail) => format!("{} ({detail})", self.messages.permission_required),
            None => self.messages.permission_required.clone(),
        };
        self.notifier.notify(NotificationLevel::Warning, &message);
    }

    pub fn unsupported(&self) {
        self.notifier
            .notify(NotificationLevel::Error, &self.messages.unsupported);
    }

    pub fn error(&self, message: &str) {
        self.notifier.notify(NotificationLevel::Error, message);
    }

    /// Show and (when `speak`) read out an assistant reply.
    pub fn reply(&self, text: &str, speak: bool) {
        self.notifier.notify(NotificationLevel::Info, text);
        if speak {
            self.synth.speak(text);
        }
    }

    pub fn silence(&self) {
        self.synth.cancel();
    }
}

// ---------------------------------------------------------------------------
// Recording doubles  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use recording::{RecordingNotifier, RecordingSynthesizer};


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
