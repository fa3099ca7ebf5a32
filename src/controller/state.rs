//! Activation state and the snapshot published to the UI layer.
//!
//! [`ControllerSnapshot`] is the single source of truth for everything the
//! UI renders: the current [`ActivationState`], permission status, the last
//! error and the last transcript.  It is published into a [`SharedSnapshot`]
//! after every event the controller handles.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::permission::PermissionStatus;

// ---------------------------------------------------------------------------
// ActivationState
// ---------------------------------------------------------------------------

/// States of the wake/sleep controller.
///
/// ```text
/// Dormant ──permission ok──▶ ListeningForWake ──wake phrase──▶ Awake
/// Awake ──capture──▶ CapturingCommand ──final──▶ Awake
///                                     └─"sleep"─▶ Dormant ─▶ ListeningForWake
/// Awake ──speech start──▶ Speaking ──speech end──▶ Awake
/// Awake ──sleep timer──▶ Dormant ─▶ ListeningForWake
/// any ──permission revoked──▶ PermissionRequired
/// any ──unsupported / retries exhausted──▶ Error
/// any ──stop──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationState {
    /// Not listening; transient on the way to `ListeningForWake`.
    #[default]
    Dormant,
    ListeningForWake,
    Awake,
    CapturingCommand,
    /// Awake while speech synthesis is playing.  Display flag only: the
    /// sleep timer still runs.
    Speaking,
    /// Microphone access refused.  Left only through `request_permission`.
    PermissionRequired,
    Error,
    /// Explicitly stopped or torn down.
    Stopped,
}

impl ActivationState {
    /// `true` in the interactive window (awake, capturing or speaking).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ActivationState::Awake | ActivationState::CapturingCommand | ActivationState::Speaking
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivationState::Dormant => "Dormant",
            ActivationState::ListeningForWake => "Listening",
            ActivationState::Awake => "Awake",
            ActivationState::CapturingCommand => "Capturing",
            ActivationState::Speaking => "Speaking",
            ActivationState::PermissionRequired => "Permission required",
            ActivationState::Error => "Error",
            ActivationState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// LastError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    PermissionDenied,
    Unsupported,
    /// Transient errors outlasted the retry budget.
    RetriesExhausted,
    /// Non-recoverable engine error.
    Recognition,
    /// Single-shot capture failed; the controller went back to `Awake`.
    CaptureAbandoned,
}

/// Most recent failure, kept until the next successful (re)start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind: ErrorKind,
    pub message: String,
}

impl LastError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ControllerSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub state: ActivationState,
    pub permission: PermissionStatus,
    pub last_error: Option<LastError>,
    /// Last wake utterance or captured command.
    pub last_transcript: Option<String>,
    /// Consecutive recoverable recognition failures.
    pub retries: u32,
}

impl ControllerSnapshot {
    pub fn listening_for_wake(&self) -> bool {
        self.state == ActivationState::ListeningForWake
    }

    pub fn awake(&self) -> bool {
        self.state.is_active()
    }

    pub fn capturing(&self) -> bool {
        self.state == ActivationState::CapturingCommand
    }

    pub fn speaking(&self) -> bool {
        self.state == ActivationState::Speaking
    }
}

/// Thread-safe handle to the latest [`ControllerSnapshot`].
///
/// Lock for a short critical section only; do **not** hold it across
/// `.await` points.
pub type SharedSnapshot = Arc<Mutex<ControllerSnapshot>>;

pub fn new_shared_snapshot() -> SharedSnapshot {
    Arc::new(Mutex::new(ControllerSnapshot::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_dormant() {
        assert_eq!(ActivationState::default(), ActivationState::Dormant);
        let snapshot = ControllerSnapshot::default();
        assert_eq!(snapshot.permission, PermissionStatus::Unknown);
        assert!(!snapshot.awake());
    }

    #[test]
    fn interactive_window_covers_awake_capturing_speaking() {
        assert!(ActivationState::Awake.is_active());
        assert!(ActivationState::CapturingCommand.is_active());
        assert!(ActivationState::Speaking.is_active());
        assert!(!ActivationState::ListeningForWake.is_active());
        assert!(!ActivationState::PermissionRequired.is_active());
        assert!(!ActivationState::Stopped.is_active());
    }

    #[test]
    fn snapshot_booleans_follow_state() {
        let mut snapshot = ControllerSnapshot {
            state: ActivationState::Speaking,
            ..Default::default()
        };
        assert!(snapshot.awake() && snapshot.speaking());
        assert!(!snapshot.capturing() && !snapshot.listening_for_wake());

        snapshot.state = ActivationState::ListeningForWake;
        assert!(snapshot.listening_for_wake());
        assert!(!snapshot.awake());
    }

    #[test]
    fn labels() {
        assert_eq!(ActivationState::ListeningForWake.to_string(), "Listening");
        assert_eq!(ActivationState::PermissionRequired.label(), "Permission required");
    }

    #[test]
    fn shared_snapshot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSnapshot>();
    }
}
