//! Everything the controller reacts to, as one typed event stream.

use tokio::sync::mpsc;

use crate::recognition::{RecognitionEvent, SessionId};

/// Input to [`WakeController::dispatch`](super::WakeController::dispatch).
///
/// Engine callbacks, timer expiries, synthesis notifications and UI actions
/// all arrive through the same channel and are handled one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Callback from the recognition engine, tagged with its session.
    Recognition {
        session: SessionId,
        event: RecognitionEvent,
    },
    /// Speech synthesis began playing.
    SpeechStarted,
    /// Speech synthesis finished (or was cancelled).
    SpeechEnded,
    /// The sleep timer armed with `generation` expired.
    SleepTimerFired { generation: u64 },
    /// Backoff for `session` elapsed; relaunch it.
    RetryDue { session: SessionId },
    /// Answer from the downstream conversational service.
    Reply(String),
    /// Imperative action from the UI layer or a hotkey.
    Action(Action),
    /// Stop the runner loop and tear the controller down.
    Shutdown,
}

/// Actions exposed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartListening,
    StopListening,
    RequestPermission,
    GoToSleep,
    CaptureCommand,
    /// The user did something (e.g. typed a command) while awake.
    NoteActivity,
}

impl From<Action> for ControllerEvent {
    fn from(action: Action) -> Self {
        ControllerEvent::Action(action)
    }
}

/// Sending half of the controller's event channel.  Cheap to clone; held by
/// engines, timers and feedback adapters.
pub type EventSender = mpsc::UnboundedSender<ControllerEvent>;

/// Receiving half, consumed by [`ControllerRunner`](super::ControllerRunner).
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;
