//! Terminal feedback adapters for the console binary.

use crate::controller::{ControllerEvent, EventSender};

use super::{NotificationLevel, NotificationSink, SpeechSynthesizer};

/// Prints what would be spoken and reports playback as instantaneous.
///
/// Sends `SpeechStarted` followed by `SpeechEnded` for every utterance so
/// the controller sees the same activity signals a real synthesizer
/// produces.
pub struct LogSynthesizer {
    events: EventSender,
}

impl LogSynthesizer {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl SpeechSynthesizer for LogSynthesizer {
    fn speak(&self, text: &str) {
        let _ = self.events.send(ControllerEvent::SpeechStarted);
        println!("joy> {text}");
        let _ = self.events.send(ControllerEvent::SpeechEnded);
    }
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => log::info!("{message}"),
            NotificationLevel::Warning => log::warn!("{message}"),
            NotificationLevel::Error => log::error!("{message}"),
        }
    }
}
