//! The wake/sleep controller.
//!
//! [`WakeController`] owns the permission gate, the session manager, the
//! sleep timer and the feedback port.  All behaviour is driven through
//! [`dispatch`](WakeController::dispatch), one event at a time, which makes
//! the transition table testable without a real recognition engine.
//!
//! # Failure handling
//!
//! | Failure                              | Outcome                          |
//! |--------------------------------------|----------------------------------|
//! | `no-speech` / `network` (wake mode)  | restart after backoff, max 2×    |
//! | budget exhausted / other error       | `Error`                          |
//! | `not-allowed`, permission denied     | `PermissionRequired`             |
//! | engine unsupported                   | `Error`, notified once           |
//! | any error during command capture     | back to `Awake`, no retry        |

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dispatch::CommandSink;
use crate::feedback::Feedback;
use crate::permission::{MicrophoneAccess, PermissionGate, PermissionStatus};
use crate::recognition::{
    RecognitionEngine, RecognitionErrorKind, RecognitionEvent, RecognitionMode, RetryDecision,
    SessionId, SessionManager, StartError,
};

use super::event::{Action, ControllerEvent};
use super::phrases::PhraseMatcher;
use super::state::{
    new_shared_snapshot, ActivationState, ControllerSnapshot, ErrorKind, LastError,
    SharedSnapshot,
};
use super::timer::{Scheduler, SleepTimer, TimerId};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External services the controller drives.
pub struct Collaborators {
    pub engine: Box<dyn RecognitionEngine>,
    pub microphone: Box<dyn MicrophoneAccess>,
    pub scheduler: Box<dyn Scheduler>,
    pub feedback: Feedback,
    pub commands: Arc<dyn CommandSink>,
}

// ---------------------------------------------------------------------------
// WakeController
// ---------------------------------------------------------------------------

pub struct WakeController {
    state: ActivationState,
    gate: PermissionGate,
    sessions: SessionManager,
    scheduler: Box<dyn Scheduler>,
    sleep_timer: SleepTimer,
    retry_timer: Option<TimerId>,
    wake_phrases: PhraseMatcher,
    sleep_phrases: PhraseMatcher,
    feedback: Feedback,
    commands: Arc<dyn CommandSink>,
    shared: SharedSnapshot,
    last_error: Option<LastError>,
    last_transcript: Option<String>,
    /// Set once the engine reported itself unsupported.
    unsupported: bool,
}

impl WakeController {
    /// Build a controller in `Dormant`, or `PermissionRequired` when the
    /// system already reports microphone access as blocked.
    ///
    /// Nothing is started; call [`start_listening`](Self::start_listening)
    /// (the runner does this on mount).
    pub fn new(config: &AppConfig, parts: Collaborators) -> Self {
        let mut gate = PermissionGate::new(parts.microphone);
        let initial = match gate.peek() {
            PermissionStatus::Denied => ActivationState::PermissionRequired,
            _ => ActivationState::Dormant,
        };
        let last_error = (initial == ActivationState::PermissionRequired).then(|| {
            LastError::new(
                ErrorKind::PermissionDenied,
                gate.failure().unwrap_or("microphone access denied"),
            )
        });

        let controller = Self {
            state: initial,
            gate,
            sessions: SessionManager::new(parts.engine, &config.recognition),
            scheduler: parts.scheduler,
            sleep_timer: SleepTimer::new(config.wake.sleep_timeout()),
            retry_timer: None,
            wake_phrases: PhraseMatcher::new(&config.wake.phrases),
            sleep_phrases: PhraseMatcher::new(&config.wake.sleep_phrases),
            feedback: parts.feedback,
            commands: parts.commands,
            shared: new_shared_snapshot(),
            last_error,
            last_transcript: None,
            unsupported: false,
        };
        controller.publish();
        controller
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state,
            permission: self.gate.status(),
            last_error: self.last_error.clone(),
            last_transcript: self.last_transcript.clone(),
            retries: self.sessions.retries(),
        }
    }

    /// Handle kept up to date after every event, for the UI layer.
    pub fn snapshot_handle(&self) -> SharedSnapshot {
        Arc::clone(&self.shared)
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    pub fn dispatch(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Recognition { session, event } => {
                self.on_recognition(session, event)
            }
            ControllerEvent::SpeechStarted => self.on_speech_started(),
            ControllerEvent::SpeechEnded => self.on_speech_ended(),
            ControllerEvent::SleepTimerFired { generation } => self.on_sleep_timer(generation),
            ControllerEvent::RetryDue { session } => self.on_retry_due(session),
            ControllerEvent::Reply(text) => self.on_reply(&text),
            ControllerEvent::Action(action) => self.perform(action),
            ControllerEvent::Shutdown => self.shutdown(),
        }
        self.publish();
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::StartListening => self.start_listening(),
            Action::StopListening => self.stop_listening(),
            Action::RequestPermission => self.request_permission(),
            Action::GoToSleep => self.go_to_sleep(),
            Action::CaptureCommand => self.capture_command(),
            Action::NoteActivity => self.note_activity(),
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Check permission and begin listening for the wake phrase.
    ///
    /// No-op while already listening or awake.  A cached `Denied` keeps the
    /// controller in `PermissionRequired`; use
    /// [`request_permission`](Self::request_permission) to ask again.
    pub fn start_listening(&mut self) {
        if self.state == ActivationState::ListeningForWake || self.state.is_active() {
            log::debug!("start_listening ignored in {}", self.state);
            return;
        }
        if self.unsupported {
            log::debug!("start_listening ignored: recognition unsupported");
            return;
        }

        match self.gate.ensure() {
            PermissionStatus::Granted => {
                self.last_error = None;
                self.listen_for_wake();
            }
            PermissionStatus::Denied | PermissionStatus::Unknown => self.require_permission(),
        }
        self.publish();
    }

    /// Abort everything and park in `Stopped`.
    pub fn stop_listening(&mut self) {
        self.teardown();
        self.transition(ActivationState::Stopped);
        self.publish();
    }

    /// Explicit user re-request after a refusal.
    pub fn request_permission(&mut self) {
        match self.gate.recheck() {
            PermissionStatus::Granted => {
                log::info!("microphone permission granted");
                if self
                    .last_error
                    .as_ref()
                    .is_some_and(|e| e.kind == ErrorKind::PermissionDenied)
                {
                    self.last_error = None;
                }
                let idle = matches!(
                    self.state,
                    ActivationState::Dormant
                        | ActivationState::PermissionRequired
                        | ActivationState::Stopped
                        | ActivationState::Error
                );
                if idle && !self.unsupported {
                    self.listen_for_wake();
                }
            }
            PermissionStatus::Denied | PermissionStatus::Unknown => self.require_permission(),
        }
        self.publish();
    }

    /// Leave the interactive window immediately.
    pub fn go_to_sleep(&mut self) {
        if self.state.is_active() {
            self.fall_asleep();
        } else {
            log::debug!("go_to_sleep ignored in {}", self.state);
        }
        self.publish();
    }

    /// Start a single-shot command capture.  Valid while `Awake`; playback
    /// in progress is cut off so the microphone hears the user.
    pub fn capture_command(&mut self) {
        match self.state {
            ActivationState::Awake => {}
            ActivationState::Speaking => self.feedback.silence(),
            _ => {
                log::debug!("capture_command ignored in {}", self.state);
                return;
            }
        }

        self.sleep_timer.cancel(self.scheduler.as_mut());
        match self.sessions.start_listening(RecognitionMode::Command) {
            Ok(id) => {
                log::info!("capturing command (session {id})");
                self.transition(ActivationState::CapturingCommand);
            }
            Err(StartError::Unsupported) => self.enter_unsupported(),
            Err(e) => self.abandon_capture(e.to_string()),
        }
        self.publish();
    }

    /// Report user activity (e.g. a typed command) while awake.
    pub fn note_activity(&mut self) {
        if matches!(self.state, ActivationState::Awake | ActivationState::Speaking) {
            self.sleep_timer.arm(self.scheduler.as_mut());
        }
    }

    /// Unmount: abort the session, cancel timers, silence feedback.
    pub fn shutdown(&mut self) {
        if self.state != ActivationState::Stopped {
            log::info!("controller shutting down from {}", self.state);
        }
        self.teardown();
        self.feedback.silence();
        self.transition(ActivationState::Stopped);
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Recognition events
    // -----------------------------------------------------------------------

    fn on_recognition(&mut self, session: SessionId, event: RecognitionEvent) {
        let Some(mode) = self
            .sessions
            .current()
            .filter(|s| s.id == session)
            .map(|s| s.mode())
        else {
            log::debug!("ignoring {event:?} from stale session {session}");
            return;
        };

        match event {
            RecognitionEvent::Started => {
                log::debug!("session {session} started ({mode:?})");
                self.sessions.mark_live(session);
            }
            RecognitionEvent::Result { text, is_final } => {
                self.sessions.reset_retries(session);
                self.on_transcript(mode, text, is_final);
            }
            RecognitionEvent::Error(kind) => self.on_recognition_error(session, mode, kind),
            RecognitionEvent::Ended => self.on_session_ended(session, mode),
        }
    }

    fn on_transcript(&mut self, mode: RecognitionMode, text: String, is_final: bool) {
        match (mode, self.state) {
            (RecognitionMode::WakePhrase, ActivationState::ListeningForWake) => {
                if let Some(phrase) = self.wake_phrases.find(&text) {
                    log::info!("wake phrase {phrase:?} heard in {text:?}");
                    self.wake(text);
                } else {
                    log::trace!("not a wake phrase: {text:?}");
                }
            }
            (RecognitionMode::Command, ActivationState::CapturingCommand) if is_final => {
                self.on_command(text);
            }
            (RecognitionMode::Command, ActivationState::CapturingCommand) => {}
            (mode, state) => log::debug!("{mode:?} transcript ignored in {state}"),
        }
    }

    fn wake(&mut self, text: String) {
        self.sessions.stop();
        self.cancel_retry();
        self.last_transcript = Some(text);
        self.last_error = None;
        self.transition(ActivationState::Awake);
        self.feedback.wake_acknowledged();
        self.sleep_timer.arm(self.scheduler.as_mut());
    }

    fn on_command(&mut self, text: String) {
        self.sessions.stop();
        let command = text.trim().to_string();
        if command.is_empty() {
            self.abandon_capture("empty transcript".into());
            return;
        }

        self.last_transcript = Some(command.clone());
        if let Some(phrase) = self.sleep_phrases.find(&command) {
            log::info!("sleep phrase {phrase:?} heard in {command:?}");
            self.fall_asleep();
            return;
        }

        log::info!("command captured: {command:?}");
        self.commands.deliver(&command);
        self.transition(ActivationState::Awake);
        self.sleep_timer.arm(self.scheduler.as_mut());
    }

    fn on_recognition_error(
        &mut self,
        session: SessionId,
        mode: RecognitionMode,
        kind: RecognitionErrorKind,
    ) {
        if kind == RecognitionErrorKind::NotAllowed {
            log::warn!("microphone permission revoked during session {session}");
            self.gate.revoke("microphone access was revoked");
            self.require_permission();
            return;
        }

        if mode == RecognitionMode::Command {
            self.abandon_capture(format!("recognition error: {kind}"));
            return;
        }

        if self.state != ActivationState::ListeningForWake {
            log::debug!("wake session error {kind} ignored in {}", self.state);
            self.sessions.stop();
            return;
        }

        match self.sessions.record_failure(session, &kind) {
            RetryDecision::Retry { attempt, delay } => {
                log::warn!(
                    "recognition {kind}: restarting in {}ms (attempt {attempt})",
                    delay.as_millis()
                );
                self.cancel_retry();
                self.retry_timer = Some(
                    self.scheduler
                        .schedule(delay, ControllerEvent::RetryDue { session }),
                );
            }
            RetryDecision::Exhausted => self.fail(
                ErrorKind::RetriesExhausted,
                format!("speech recognition keeps failing ({kind}); giving up"),
            ),
            RetryDecision::GiveUp => {
                self.fail(ErrorKind::Recognition, format!("speech recognition error: {kind}"))
            }
        }
    }

    fn on_session_ended(&mut self, session: SessionId, mode: RecognitionMode) {
        if self.sessions.is_retry_pending(session) {
            log::debug!("session {session} ended; restart already scheduled");
            return;
        }

        match mode {
            RecognitionMode::Command => {
                if self.state == ActivationState::CapturingCommand {
                    self.abandon_capture("capture ended without a transcript".into());
                } else {
                    self.sessions.stop();
                }
            }
            RecognitionMode::WakePhrase => {
                let listening = matches!(
                    self.state,
                    ActivationState::Dormant | ActivationState::ListeningForWake
                );
                if listening && self.gate.status().is_granted() {
                    log::debug!("session {session} ended; restarting wake listening");
                    self.relaunch();
                } else {
                    self.sessions.stop();
                }
            }
        }
    }

    fn on_retry_due(&mut self, session: SessionId) {
        self.retry_timer = None;
        if !self.sessions.is_retry_pending(session) {
            log::debug!("retry for stale session {session} ignored");
            return;
        }
        if self.state != ActivationState::ListeningForWake || !self.gate.status().is_granted() {
            log::debug!("retry for session {session} ignored in {}", self.state);
            self.sessions.stop();
            return;
        }
        self.relaunch();
    }

    fn relaunch(&mut self) {
        match self.sessions.restart() {
            Ok(id) => log::debug!("wake listening relaunched as session {id}"),
            Err(StartError::Unsupported) => self.enter_unsupported(),
            Err(e) => self.fail(ErrorKind::Recognition, e.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Timer / synthesis / reply events
    // -----------------------------------------------------------------------

    fn on_sleep_timer(&mut self, generation: u64) {
        if !self.sleep_timer.take_fire(generation) {
            log::debug!("stale sleep timer (generation {generation}) ignored");
            return;
        }
        if matches!(self.state, ActivationState::Awake | ActivationState::Speaking) {
            log::info!("no activity for {:?}; going to sleep", self.sleep_timer.duration());
            self.fall_asleep();
        }
    }

    /// Playback start and end both count as activity.  `Speaking` is only
    /// a display flag: the sleep timer keeps running in case the
    /// synthesizer never reports the end.
    fn on_speech_started(&mut self) {
        if matches!(self.state, ActivationState::Awake | ActivationState::Speaking) {
            self.transition(ActivationState::Speaking);
            self.sleep_timer.arm(self.scheduler.as_mut());
        }
    }

    fn on_speech_ended(&mut self) {
        if matches!(self.state, ActivationState::Awake | ActivationState::Speaking) {
            self.transition(ActivationState::Awake);
            self.sleep_timer.arm(self.scheduler.as_mut());
        }
    }

    fn on_reply(&mut self, text: &str) {
        let speak = matches!(
            self.state,
            ActivationState::Awake | ActivationState::Speaking
        );
        self.feedback.reply(text, speak);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Dormant → ListeningForWake` with a fresh wake-mode session.
    fn listen_for_wake(&mut self) {
        self.sleep_timer.cancel(self.scheduler.as_mut());
        self.cancel_retry();
        self.transition(ActivationState::Dormant);

        match self.sessions.start_listening(RecognitionMode::WakePhrase) {
            Ok(id) => {
                log::info!("listening for wake phrase (session {id})");
                self.transition(ActivationState::ListeningForWake);
            }
            Err(StartError::Unsupported) => self.enter_unsupported(),
            Err(e) => self.fail(ErrorKind::Recognition, e.to_string()),
        }
    }

    fn fall_asleep(&mut self) {
        self.sessions.stop();
        self.sleep_timer.cancel(self.scheduler.as_mut());
        self.feedback.going_to_sleep();
        self.listen_for_wake();
    }

    /// Capture failed: back to `Awake` without retrying or notifying.
    fn abandon_capture(&mut self, reason: String) {
        log::debug!("command capture abandoned: {reason}");
        self.sessions.stop();
        self.last_error = Some(LastError::new(ErrorKind::CaptureAbandoned, reason));
        self.transition(ActivationState::Awake);
        self.sleep_timer.arm(self.scheduler.as_mut());
    }

    fn require_permission(&mut self) {
        self.teardown();
        let detail = self.gate.failure().map(str::to_string);
        self.last_error = Some(LastError::new(
            ErrorKind::PermissionDenied,
            detail.clone().unwrap_or_else(|| "microphone access denied".into()),
        ));
        self.transition(ActivationState::PermissionRequired);
        self.feedback.permission_required(detail.as_deref());
    }

    fn enter_unsupported(&mut self) {
        self.teardown();
        self.last_error = Some(LastError::new(
            ErrorKind::Unsupported,
            StartError::Unsupported.to_string(),
        ));
        self.transition(ActivationState::Error);
        if !self.unsupported {
            self.unsupported = true;
            log::error!("speech recognition is not supported on this system");
            self.feedback.unsupported();
        }
    }

    fn fail(&mut self, kind: ErrorKind, message: String) {
        log::error!("{message}");
        self.teardown();
        self.feedback.error(&message);
        self.last_error = Some(LastError::new(kind, message));
        self.transition(ActivationState::Error);
    }

    fn teardown(&mut self) {
        self.sessions.stop();
        self.sleep_timer.cancel(self.scheduler.as_mut());
        self.cancel_retry();
    }

    fn cancel_retry(&mut self) {
        if let Some(id) = self.retry_timer.take() {
            self.scheduler.cancel(id);
        }
    }

    fn transition(&mut self, next: ActivationState) {
        if self.state != next {
            log::debug!("state: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        if let Ok(mut shared) = self.shared.lock() {
            *shared = snapshot;
        }
    }
}

impl Drop for WakeController {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dispatch::RecordingCommandSink;
    use crate::feedback::{NotificationLevel, RecordingNotifier, RecordingSynthesizer};
    use crate::permission::{AccessError, MockMicrophone, SystemPermission};
    use crate::recognition::MockRecognitionEngine;
    use crate::controller::timer::ManualScheduler;

    const SLEEP: Duration = Duration::from_secs(30);

    struct Harness {
        controller: WakeController,
        engine: MockRecognitionEngine,
        mic: MockMicrophone,
        scheduler: ManualScheduler,
        synth: Arc<RecordingSynthesizer>,
        notifier: Arc<RecordingNotifier>,
        commands: Arc<RecordingCommandSink>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_microphone(MockMicrophone::granting())
        }

        fn with_microphone(mic: MockMicrophone) -> Self {
            let engine = MockRecognitionEngine::new();
            let scheduler = ManualScheduler::new();
            let synth = Arc::new(RecordingSynthesizer::default());
            let notifier = Arc::new(RecordingNotifier::default());
            let commands = Arc::new(RecordingCommandSink::default());
            let config = AppConfig::default();

            let controller = WakeController::new(
                &config,
                Collaborators {
                    engine: Box::new(engine.clone()),
                    microphone: Box::new(mic.clone()),
                    scheduler: Box::new(scheduler.clone()),
                    feedback: Feedback::new(
                        synth.clone(),
                        notifier.clone(),
                        config.feedback.clone(),
                    ),
                    commands: commands.clone(),
                },
            );

            Self {
                controller,
                engine,
                mic,
                scheduler,
                synth,
                notifier,
                commands,
            }
        }

        fn state(&self) -> ActivationState {
            self.controller.state()
        }

        fn session(&self) -> SessionId {
            self.engine.last_session().expect("no session started")
        }

        fn recognize_in(&mut self, session: SessionId, event: RecognitionEvent) {
            self.controller
                .dispatch(ControllerEvent::Recognition { session, event });
        }

        fn recognize(&mut self, event: RecognitionEvent) {
            let session = self.session();
            self.recognize_in(session, event);
        }

        fn hear(&mut self, text: &str) {
            self.recognize(RecognitionEvent::Result {
                text: text.into(),
                is_final: true,
            });
        }

        fn fail_with(&mut self, kind: RecognitionErrorKind) {
            self.recognize(RecognitionEvent::Error(kind));
        }

        fn advance(&mut self, by: Duration) {
            for event in self.scheduler.advance(by) {
                self.controller.dispatch(event);
            }
        }

        fn wake(&mut self) {
            self.controller.start_listening();
            self.hear("hey joy");
            assert_eq!(self.state(), ActivationState::Awake);
        }

        fn starts(&self) -> usize {
            self.engine.starts().len()
        }
    }

    // ---- Permission / startup ----------------------------------------------

    #[test]
    fn start_listening_probes_once_and_listens_for_wake() {
        let mut h = Harness::new();
        assert_eq!(h.state(), ActivationState::Dormant);

        h.controller.start_listening();

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.mic.probes(), 1);
        assert_eq!(
            h.engine.starts(),
            vec![(h.session(), RecognitionMode::WakePhrase)]
        );
        assert_eq!(h.controller.snapshot().permission, PermissionStatus::Granted);
    }

    #[test]
    fn known_denied_permission_starts_in_permission_required() {
        let mic = MockMicrophone::with(Some(SystemPermission::Denied), Ok(()));
        let h = Harness::with_microphone(mic);

        assert_eq!(h.state(), ActivationState::PermissionRequired);
        assert_eq!(h.mic.probes(), 0);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::PermissionDenied);
    }

    #[test]
    fn denied_probe_then_consent_on_request() {
        let mut h = Harness::with_microphone(MockMicrophone::denying());

        h.controller.start_listening();
        assert_eq!(h.state(), ActivationState::PermissionRequired);
        assert_eq!(h.starts(), 0);
        assert_eq!(h.notifier.count(NotificationLevel::Warning), 1);

        // Not retried automatically.
        h.controller.start_listening();
        assert_eq!(h.state(), ActivationState::PermissionRequired);
        assert_eq!(h.mic.probes(), 1);

        h.mic.set_outcome(Ok(()));
        h.controller.request_permission();

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.mic.probes(), 2);
        assert!(h.controller.snapshot().last_error.is_none());
    }

    #[test]
    fn not_allowed_mid_session_requires_permission() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::NotAllowed);

        assert_eq!(h.state(), ActivationState::PermissionRequired);
        assert_eq!(h.engine.live(), None);
        assert!(h.scheduler.pending().is_empty());
        assert_eq!(h.controller.snapshot().permission, PermissionStatus::Denied);

        // The following engine end must not restart listening.
        h.recognize(RecognitionEvent::Ended);
        assert_eq!(h.starts(), 1);
    }

    #[test]
    fn not_allowed_during_capture_requires_permission() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.fail_with(RecognitionErrorKind::NotAllowed);

        assert_eq!(h.state(), ActivationState::PermissionRequired);
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn missing_device_surfaces_reason() {
        let mic = MockMicrophone::with(None, Err(AccessError::NoDevice));
        let mut h = Harness::with_microphone(mic);

        h.controller.start_listening();

        let error = h.controller.snapshot().last_error.unwrap();
        assert_eq!(error.kind, ErrorKind::PermissionDenied);
        assert!(error.message.contains("no microphone"));
    }

    // ---- Wake phrase ------------------------------------------------------

    #[test]
    fn hey_joy_wakes_acknowledges_and_arms_sleep_timer() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.hear("hey, joy");

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.engine.live(), None);
        assert_eq!(h.synth.spoken(), vec![AppConfig::default().feedback.acknowledgement]);
        assert_eq!(h.scheduler.pending(), vec![SLEEP]);
        assert_eq!(h.controller.snapshot().last_transcript.as_deref(), Some("hey, joy"));
    }

    #[test]
    fn interim_and_final_of_one_utterance_wake_once() {
        let mut h = Harness::new();
        h.controller.start_listening();
        let session = h.session();

        h.recognize_in(
            session,
            RecognitionEvent::Result { text: "Hey Joy".into(), is_final: false },
        );
        h.recognize_in(
            session,
            RecognitionEvent::Result { text: "Hey Joy, what's new".into(), is_final: true },
        );

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.synth.spoken().len(), 1);
        assert_eq!(h.scheduler.pending().len(), 1);
    }

    #[test]
    fn other_speech_keeps_listening() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.hear("open the campaign dashboard");

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(h.engine.live().is_some());
        assert!(h.synth.spoken().is_empty());
    }

    #[test]
    fn events_from_aborted_session_are_ignored() {
        let mut h = Harness::new();
        h.controller.start_listening();
        let old = h.session();
        h.controller.stop_listening();
        h.controller.start_listening();

        h.recognize_in(
            old,
            RecognitionEvent::Result { text: "hey joy".into(), is_final: true },
        );
        h.recognize_in(old, RecognitionEvent::Error(RecognitionErrorKind::Network));

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(h.scheduler.pending().is_empty());
    }

    // ---- Sleep timer --------------------------------------------------------

    #[test]
    fn inactivity_returns_to_wake_listening() {
        let mut h = Harness::new();
        h.wake();

        h.advance(SLEEP - Duration::from_secs(1));
        assert_eq!(h.state(), ActivationState::Awake);

        h.advance(Duration::from_secs(1));
        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.starts(), 2);
        assert_eq!(h.engine.starts()[1].1, RecognitionMode::WakePhrase);
        let going_to_sleep = AppConfig::default().feedback.going_to_sleep;
        assert!(h.notifier.notes().iter().any(|(_, m)| *m == going_to_sleep));
    }

    #[test]
    fn activity_postpones_sleep_by_full_duration() {
        let mut h = Harness::new();
        h.wake();

        h.advance(Duration::from_secs(20));
        h.controller.note_activity();
        h.advance(Duration::from_secs(29));
        assert_eq!(h.state(), ActivationState::Awake);

        h.advance(Duration::from_secs(1));
        assert_eq!(h.state(), ActivationState::ListeningForWake);
    }

    #[test]
    fn stale_sleep_generation_is_ignored() {
        let mut h = Harness::new();
        h.wake();
        h.controller.note_activity();

        h.controller
            .dispatch(ControllerEvent::SleepTimerFired { generation: 1 });

        assert_eq!(h.state(), ActivationState::Awake);
    }

    #[test]
    fn speech_start_and_end_each_reset_the_sleep_timer() {
        let mut h = Harness::new();
        h.wake();

        h.advance(Duration::from_secs(20));
        h.controller.dispatch(ControllerEvent::SpeechStarted);
        assert_eq!(h.state(), ActivationState::Speaking);
        assert!(h.controller.snapshot().speaking());
        assert_eq!(h.scheduler.pending(), vec![SLEEP]);

        h.advance(Duration::from_secs(25));
        h.controller.dispatch(ControllerEvent::SpeechEnded);
        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.scheduler.pending(), vec![SLEEP]);

        h.advance(SLEEP - Duration::from_secs(1));
        assert_eq!(h.state(), ActivationState::Awake);
        h.advance(Duration::from_secs(1));
        assert_eq!(h.state(), ActivationState::ListeningForWake);
    }

    #[test]
    fn missing_speech_end_still_falls_asleep() {
        let mut h = Harness::new();
        h.wake();
        h.controller.dispatch(ControllerEvent::SpeechStarted);
        let cancels_before = *h.synth.cancels.lock().unwrap();

        h.advance(SLEEP);

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(*h.synth.cancels.lock().unwrap() > cancels_before);
        assert_eq!(h.starts(), 2);
    }

    #[test]
    fn capture_while_speaking_cuts_playback() {
        let mut h = Harness::new();
        h.wake();
        h.controller.dispatch(ControllerEvent::SpeechStarted);
        let cancels_before = *h.synth.cancels.lock().unwrap();

        h.controller.capture_command();

        assert_eq!(h.state(), ActivationState::CapturingCommand);
        assert_eq!(h.engine.starts()[1].1, RecognitionMode::Command);
        assert_eq!(*h.synth.cancels.lock().unwrap(), cancels_before + 1);
        assert!(h.scheduler.pending().is_empty());

        // The cancelled playback reports its end; capture is unaffected.
        h.controller.dispatch(ControllerEvent::SpeechEnded);
        assert_eq!(h.state(), ActivationState::CapturingCommand);

        h.hear("open the pipeline report");
        assert_eq!(h.commands.delivered(), vec!["open the pipeline report".to_string()]);
    }

    #[test]
    fn go_to_sleep_cancels_timer_and_listens_again() {
        let mut h = Harness::new();
        h.wake();

        h.controller.go_to_sleep();

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(h.scheduler.pending().is_empty());
        assert!(!h.engine.overlapped());
    }

    // ---- Command capture ----------------------------------------------------

    #[test]
    fn captured_command_is_forwarded_and_rearms_timer() {
        let mut h = Harness::new();
        h.wake();

        h.controller.capture_command();
        assert_eq!(h.state(), ActivationState::CapturingCommand);
        assert_eq!(h.engine.starts()[1].1, RecognitionMode::Command);
        assert!(h.scheduler.pending().is_empty());

        h.hear("show today's campaigns");

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.commands.delivered(), vec!["show today's campaigns".to_string()]);
        assert_eq!(h.scheduler.pending(), vec![SLEEP]);
    }

    #[test]
    fn interim_results_during_capture_are_ignored() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.recognize(RecognitionEvent::Result { text: "show".into(), is_final: false });

        assert_eq!(h.state(), ActivationState::CapturingCommand);
        assert!(h.commands.delivered().is_empty());
    }

    #[test]
    fn sleep_command_bypasses_awake() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.hear("please go to sleep");

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(h.commands.delivered().is_empty());
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn capture_error_returns_to_awake_without_retry() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.fail_with(RecognitionErrorKind::NoSpeech);
        h.recognize(RecognitionEvent::Ended);

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.starts(), 2);
        assert_eq!(h.scheduler.pending(), vec![SLEEP]);
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::CaptureAbandoned
        );
        assert_eq!(h.notifier.count(NotificationLevel::Error), 0);
    }

    #[test]
    fn capture_ended_without_result_returns_to_awake() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.recognize(RecognitionEvent::Ended);

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.starts(), 2);
    }

    #[test]
    fn capture_is_only_possible_while_awake() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.controller.capture_command();

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.starts(), 1);
    }

    // ---- Retry budget -------------------------------------------------------

    #[test]
    fn no_speech_is_retried_twice_then_errors() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::NoSpeech);
        h.recognize(RecognitionEvent::Ended);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(1)]);
        assert_eq!(h.starts(), 1);

        h.advance(Duration::from_secs(1));
        assert_eq!(h.starts(), 2);
        assert_eq!(h.controller.snapshot().retries, 1);

        h.fail_with(RecognitionErrorKind::NoSpeech);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(2)]);
        h.advance(Duration::from_secs(2));
        assert_eq!(h.starts(), 3);

        h.fail_with(RecognitionErrorKind::NoSpeech);
        assert_eq!(h.state(), ActivationState::Error);
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::RetriesExhausted
        );

        h.recognize(RecognitionEvent::Ended);
        h.advance(Duration::from_secs(60));
        assert_eq!(h.starts(), 3);
        assert_eq!(h.notifier.count(NotificationLevel::Error), 1);
    }

    #[test]
    fn transcript_resets_the_retry_budget() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::NoSpeech);
        h.advance(Duration::from_secs(1));
        h.hear("just talking");
        h.fail_with(RecognitionErrorKind::NoSpeech);

        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn network_errors_back_off_longer() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::Network);

        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(3)]);
        assert_eq!(h.state(), ActivationState::ListeningForWake);
    }

    #[test]
    fn network_errors_share_the_retry_budget() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::Network);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(3)]);
        h.advance(Duration::from_secs(3));
        assert_eq!(h.starts(), 2);

        h.fail_with(RecognitionErrorKind::Network);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(6)]);
        h.advance(Duration::from_secs(6));
        assert_eq!(h.starts(), 3);

        h.fail_with(RecognitionErrorKind::Network);
        assert_eq!(h.state(), ActivationState::Error);
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::RetriesExhausted
        );

        h.advance(Duration::from_secs(60));
        assert_eq!(h.starts(), 3);
    }

    #[test]
    fn mixed_transient_errors_count_against_one_budget() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::NoSpeech);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(1)]);
        h.advance(Duration::from_secs(1));

        // Second consecutive failure: network base delay, second attempt.
        h.fail_with(RecognitionErrorKind::Network);
        assert_eq!(h.scheduler.pending(), vec![Duration::from_secs(6)]);
        h.advance(Duration::from_secs(6));
        assert_eq!(h.starts(), 3);

        h.fail_with(RecognitionErrorKind::NoSpeech);
        assert_eq!(h.state(), ActivationState::Error);
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::RetriesExhausted
        );
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn other_errors_fail_immediately() {
        let mut h = Harness::new();
        h.controller.start_listening();

        h.fail_with(RecognitionErrorKind::AudioCapture);

        assert_eq!(h.state(), ActivationState::Error);
        assert!(h.scheduler.pending().is_empty());
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::Recognition
        );
    }

    #[test]
    fn start_listening_recovers_from_error_with_fresh_budget() {
        let mut h = Harness::new();
        h.controller.start_listening();
        h.fail_with(RecognitionErrorKind::AudioCapture);

        h.controller.start_listening();

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.controller.snapshot().retries, 0);
        assert!(h.controller.snapshot().last_error.is_none());
    }

    // ---- Engine end / restart -----------------------------------------------

    #[test]
    fn engine_end_restarts_wake_listening() {
        let mut h = Harness::new();
        h.controller.start_listening();
        let first = h.session();

        h.engine.end(first);
        h.recognize_in(first, RecognitionEvent::Ended);

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert_eq!(h.starts(), 2);
        assert_ne!(h.session(), first);
    }

    #[test]
    fn late_wake_session_end_does_not_restart_while_awake() {
        let mut h = Harness::new();
        h.controller.start_listening();
        let wake_session = h.session();
        h.hear("hey joy");

        h.recognize_in(wake_session, RecognitionEvent::Ended);

        assert_eq!(h.state(), ActivationState::Awake);
        assert_eq!(h.starts(), 1);
    }

    #[test]
    fn full_cycle_never_overlaps_sessions() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();
        h.hear("list prospects");
        h.controller.capture_command();
        h.hear("go to sleep");
        h.hear("hey joy");
        h.advance(SLEEP);

        assert_eq!(h.state(), ActivationState::ListeningForWake);
        assert!(!h.engine.overlapped());
    }

    // ---- Unsupported / stop -------------------------------------------------

    #[test]
    fn unsupported_engine_is_terminal_and_notified_once() {
        let mut h = Harness::new();
        h.engine.fail_starts_with(StartError::Unsupported);

        h.controller.start_listening();
        h.controller.start_listening();
        h.controller.request_permission();

        assert_eq!(h.state(), ActivationState::Error);
        assert_eq!(
            h.controller.snapshot().last_error.unwrap().kind,
            ErrorKind::Unsupported
        );
        assert_eq!(h.notifier.count(NotificationLevel::Error), 1);
    }

    #[test]
    fn stop_tears_down_from_any_state() {
        let mut h = Harness::new();
        h.wake();
        h.controller.capture_command();

        h.controller.stop_listening();

        assert_eq!(h.state(), ActivationState::Stopped);
        assert_eq!(h.engine.live(), None);
        assert!(h.scheduler.pending().is_empty());

        h.hear("hey joy");
        assert_eq!(h.state(), ActivationState::Stopped);
    }

    #[test]
    fn drop_aborts_live_session() {
        let mut h = Harness::new();
        h.controller.start_listening();
        let engine = h.engine.clone();

        drop(h);

        assert_eq!(engine.live(), None);
    }

    // ---- Replies / snapshot -------------------------------------------------

    #[test]
    fn reply_is_spoken_only_while_awake() {
        let mut h = Harness::new();
        h.controller.start_listening();
        h.controller.dispatch(ControllerEvent::Reply("late answer".into()));
        assert!(h.synth.spoken().is_empty());

        h.hear("hey joy");
        h.controller.dispatch(ControllerEvent::Reply("You have 3 campaigns.".into()));
        assert_eq!(h.synth.spoken().last().map(String::as_str), Some("You have 3 campaigns."));
    }

    #[test]
    fn shared_snapshot_tracks_dispatch() {
        let mut h = Harness::new();
        let shared = h.controller.snapshot_handle();
        h.controller.start_listening();
        let session = h.session();

        h.controller.dispatch(ControllerEvent::Recognition {
            session,
            event: RecognitionEvent::Result { text: "hey joy".into(), is_final: true },
        });

        let snapshot = shared.lock().unwrap().clone();
        assert!(snapshot.awake());
        assert!(!snapshot.listening_for_wake());
        assert_eq!(snapshot.permission, PermissionStatus::Granted);
    }
}
