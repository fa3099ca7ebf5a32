//! Session bookkeeping: mutual exclusion, retry budget and backoff.
//!
//! [`SessionManager`] owns the engine and at most one [`Session`].  Starting
//! a new session always aborts the previous one first, and the old
//! session's id stops being "current" at that moment, so any callback it
//! still delivers is recognisably stale.

use std::time::Duration;

use crate::config::RecognitionConfig;

use super::{
    RecognitionEngine, RecognitionErrorKind, RecognitionMode, SessionConfig, SessionId,
    StartError,
};

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Bounded, escalating restart policy for transient recognition errors.
///
/// The delay grows linearly with the attempt number from a per-kind base:
/// with the defaults `no-speech` waits 1 s then 2 s, `network` 3 s then 6 s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub no_speech_backoff: Duration,
    pub network_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            no_speech_backoff: Duration::from_millis(config.no_speech_backoff_ms),
            network_backoff: Duration::from_millis(config.network_backoff_ms),
        }
    }

    /// Decide what to do about failure number `attempt` (1-based).
    pub fn decide(&self, kind: &RecognitionErrorKind, attempt: u32) -> RetryDecision {
        let base = match kind {
            RecognitionErrorKind::NoSpeech => self.no_speech_backoff,
            RecognitionErrorKind::Network => self.network_backoff,
            _ => return RetryDecision::GiveUp,
        };
        if attempt > self.max_retries {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry {
            attempt,
            delay: base * attempt,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RecognitionConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Restart the session after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// Budget used up.
    Exhausted,
    /// The error kind is never retried.
    GiveUp,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// `start` accepted, `Started` not seen yet.
    Starting,
    Live,
    /// Failed with a recoverable error; a restart is scheduled.
    RetryPending,
}

/// One continuous-recognition attempt.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub config: SessionConfig,
    /// Consecutive recoverable failures.  Carried over when the session is
    /// relaunched, reset when the engine hears anything.
    pub retries: u32,
    pub phase: SessionPhase,
}

impl Session {
    pub fn mode(&self) -> RecognitionMode {
        self.config.mode
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

pub struct SessionManager {
    engine: Box<dyn RecognitionEngine>,
    language: String,
    interim_results: bool,
    policy: RetryPolicy,
    current: Option<Session>,
    next_id: u64,
}

impl SessionManager {
    pub fn new(engine: Box<dyn RecognitionEngine>, config: &RecognitionConfig) -> Self {
        Self {
            engine,
            language: config.language.clone(),
            interim_results: config.interim_results,
            policy: RetryPolicy::from_config(config),
            current: None,
            next_id: 1,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.current.as_ref().is_some_and(|s| s.id == id)
    }

    /// `true` while `id` is current and waiting for its scheduled restart.
    pub fn is_retry_pending(&self, id: SessionId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.id == id && s.phase == SessionPhase::RetryPending)
    }

    /// Retry counter of the current session (0 when idle).
    pub fn retries(&self) -> u32 {
        self.current.as_ref().map_or(0, |s| s.retries)
    }

    /// Stop whatever is running and start a fresh session in `mode`.
    pub fn start_listening(&mut self, mode: RecognitionMode) -> Result<SessionId, StartError> {
        self.launch(mode, 0)
    }

    /// Relaunch the current session's mode under a new id, keeping its
    /// retry counter.
    pub fn restart(&mut self) -> Result<SessionId, StartError> {
        let (mode, retries) = match &self.current {
            Some(s) => (s.mode(), s.retries),
            None => return Err(StartError::Failed("no session to restart".into())),
        };
        self.launch(mode, retries)
    }

    /// Abort the live session, if any.  Idempotent.
    pub fn stop(&mut self) {
        if let Some(session) = self.current.take() {
            log::debug!("session {}: abort ({:?})", session.id, session.mode());
            self.engine.abort(session.id);
        }
    }

    pub fn mark_live(&mut self, id: SessionId) {
        if let Some(s) = self.current.as_mut().filter(|s| s.id == id) {
            s.phase = SessionPhase::Live;
        }
    }

    /// The engine produced a transcript: the failure streak is over.
    pub fn reset_retries(&mut self, id: SessionId) {
        if let Some(s) = self.current.as_mut().filter(|s| s.id == id) {
            s.retries = 0;
        }
    }

    /// Charge a failure to the current session and return the policy's
    /// verdict.  On `Retry` the session is parked in `RetryPending`.
    pub fn record_failure(&mut self, id: SessionId, kind: &RecognitionErrorKind) -> RetryDecision {
        let Some(session) = self.current.as_mut().filter(|s| s.id == id) else {
            return RetryDecision::GiveUp;
        };
        if !kind.is_recoverable() {
            return RetryDecision::GiveUp;
        }
        session.retries += 1;
        let decision = self.policy.decide(kind, session.retries);
        if matches!(decision, RetryDecision::Retry { .. }) {
            session.phase = SessionPhase::RetryPending;
        }
        decision
    }

    fn launch(&mut self, mode: RecognitionMode, retries: u32) -> Result<SessionId, StartError> {
        self.stop();

        let id = SessionId::new(self.next_id);
        self.next_id += 1;

        let config = SessionConfig {
            mode,
            language: self.language.clone(),
            continuous: mode == RecognitionMode::WakePhrase,
            interim_results: mode == RecognitionMode::WakePhrase && self.interim_results,
        };

        self.engine.start(id, &config)?;
        log::debug!("session {id}: start {mode:?} (retries={retries})");

        self.current = Some(Session {
            id,
            config,
            retries,
            phase: SessionPhase::Starting,
        });
        Ok(id)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
