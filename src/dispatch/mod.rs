//! Downstream consumers of captured commands.
//!
//! The controller hands every finalized command transcript to a
//! [`CommandSink`] and moves on; it never interprets the content.
//!
//! * [`LogCommandSink`]: logs the transcript (chat disabled).
//! * [`ChatCommandSink`]: forwards it to a [`ChatBackend`] and posts the
//!   reply back to the controller as [`ControllerEvent::Reply`].
//!
//! [`ControllerEvent::Reply`]: crate::controller::ControllerEvent::Reply

pub mod chat;

pub use chat::{ApiChat, ChatBackend, ChatCommandSink, ChatError};

/// Receiver of finalized command transcripts.  Must not block.
pub trait CommandSink: Send + Sync {
    fn deliver(&self, transcript: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogCommandSink;

impl CommandSink for LogCommandSink {
    fn deliver(&self, transcript: &str) {
        log::info!("command: {transcript}");
    }
}

#[cfg(test)]
pub use recording::RecordingCommandSink;
