//! Recognition engine trait and the test double.
//!
//! [`RecognitionEngine`] is the port the session manager drives.  It is
//! object-safe and `Send` so it can live inside the controller behind a
//! `Box<dyn RecognitionEngine>`.
//!
//! Engines deliver their callbacks asynchronously through the controller's
//! event channel (see [`crate::controller::EventSender`]); `start` only
//! reports whether the engine accepted the request.

use thiserror::Error;

use super::{SessionConfig, SessionId};

// ---------------------------------------------------------------------------
// StartError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    /// No recognition engine is available on this platform.
    #[error("speech recognition is not supported")]
    Unsupported,

    /// The engine still has a live session.
    #[error("recognition engine is busy with session {0}")]
    Busy(SessionId),

    #[error("failed to start recognition: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// RecognitionEngine trait
// ---------------------------------------------------------------------------

/// A continuous speech-recognition service supporting one session at a time.
///
/// # Contract
///
/// - Every event produced after a successful `start` is tagged with `session`.
/// - After `abort(session)` the engine should stop producing events for that
///   session; late events are tolerated and filtered by the controller.
pub trait RecognitionEngine: Send {
    fn start(&mut self, session: SessionId, config: &SessionConfig) -> Result<(), StartError>;

    fn abort(&mut self, session: SessionId);
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn RecognitionEngine>) {}
};

// ---------------------------------------------------------------------------
// MockRecognitionEngine  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{EngineCall, MockRecognitionEngine};
