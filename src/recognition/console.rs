//! Line-oriented recognition engine reading transcripts from stdin.
//!
//! Every line typed while a session is live is delivered as a final
//! transcript.  A handful of control lines simulate engine behaviour:
//!
//! | Line           | Delivered                                  |
//! |----------------|--------------------------------------------|
//! | `!no-speech`   | `Error(NoSpeech)` then `Ended`             |
//! | `!network`     | `Error(Network)` then `Ended`              |
//! | `!not-allowed` | `Error(NotAllowed)` then `Ended`           |
//! | `!error <code>`| `Error(from_code(code))` then `Ended`      |
//! | `!end`         | `Ended`                                    |
//!
//! Lines starting with `/` are UI actions and are accepted in any state:
//! `/capture`, `/sleep`, `/start`, `/stop`, `/permission`, `/quit`.
//!
//! `stdin` is read on a dedicated OS thread because the read is blocking.

use std::io::BufRead;
use std::sync::{Arc, Mutex};

use crate::controller::{Action, ControllerEvent, EventSender};

use super::{
    RecognitionEngine, RecognitionErrorKind, RecognitionEvent, RecognitionMode, SessionConfig,
    SessionId, StartError,
};

type ActiveSession = Arc<Mutex<Option<(SessionId, RecognitionMode)>>>;

/// [`RecognitionEngine`] fed by the terminal.
pub struct ConsoleRecognizer {
    active: ActiveSession,
    events: EventSender,
}

impl ConsoleRecognizer {
    /// Spawn the stdin reader thread and return the engine handle.
    pub fn spawn(events: EventSender) -> std::io::Result<Self> {
        let active: ActiveSession = Arc::new(Mutex::new(None));

        let reader_active = Arc::clone(&active);
        let reader_events = events.clone();
        std::thread::Builder::new()
            .name("console-recognizer".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => deliver_line(&reader_active, &reader_events, &line),
                        Err(e) => {
                            log::error!("console-recognizer: stdin read failed: {e}");
                            break;
                        }
                    }
                }
                log::info!("console-recognizer: stdin closed");
            })?;

        Ok(Self { active, events })
    }
}

impl RecognitionEngine for ConsoleRecognizer {
    fn start(&mut self, session: SessionId, config: &SessionConfig) -> Result<(), StartError> {
        let mut active = self
            .active
            .lock()
            .map_err(|e| StartError::Failed(e.to_string()))?;
        if let Some((live, _)) = *active {
            return Err(StartError::Busy(live));
        }
        *active = Some((session, config.mode));

        match config.mode {
            RecognitionMode::WakePhrase => log::info!("(listening for wake phrase)"),
            RecognitionMode::Command => log::info!("(listening for a command)"),
        }
        let _ = self.events.send(ControllerEvent::Recognition {
            session,
            event: RecognitionEvent::Started,
        });
        Ok(())
    }

    fn abort(&mut self, session: SessionId) {
        if let Ok(mut active) = self.active.lock() {
            if matches!(*active, Some((live, _)) if live == session) {
                *active = None;
            }
        }
    }
}

/// Translate one stdin line for the active session, if any.
fn deliver_line(active: &ActiveSession, events: &EventSender, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if let Some(command) = line.strip_prefix('/') {
        let event = match command {
            "capture" => Action::CaptureCommand.into(),
            "sleep" => Action::GoToSleep.into(),
            "start" => Action::StartListening.into(),
            "stop" => Action::StopListening.into(),
            "permission" => Action::RequestPermission.into(),
            "quit" => ControllerEvent::Shutdown,
            other => {
                log::warn!("console-recognizer: unknown command /{other}");
                return;
            }
        };
        let _ = events.send(event);
        return;
    }

    let Ok(mut guard) = active.lock() else {
        return;
    };
    let Some((session, mode)) = *guard else {
        log::debug!("console-recognizer: no live session, dropping {line:?}");
        return;
    };

    let send = |event: RecognitionEvent| {
        let _ = events.send(ControllerEvent::Recognition { session, event });
    };

    if let Some(control) = line.strip_prefix('!') {
        let kind = match control {
            "end" => None,
            "no-speech" | "network" | "not-allowed" => Some(RecognitionErrorKind::from_code(control)),
            other => match other.strip_prefix("error ") {
                Some(code) => Some(RecognitionErrorKind::from_code(code)),
                None => {
                    log::warn!("console-recognizer: unknown control line !{other}");
                    return;
                }
            },
        };
        if let Some(kind) = kind {
            send(RecognitionEvent::Error(kind));
        }
        send(RecognitionEvent::Ended);
        *guard = None;
        return;
    }

    send(RecognitionEvent::Result {
        text: line.to_string(),
        is_final: true,
    });

    // Command capture is single-shot: the engine ends after one result.
    if mode == RecognitionMode::Command {
        send(RecognitionEvent::Ended);
        *guard = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
