//! Microphone permission: the leaf dependency of the controller.
//!
//! [`PermissionGate`] answers one question, "may we listen?", and caches the
//! answer for the lifetime of the controller.  The platform side sits behind
//! the [`MicrophoneAccess`] trait so the gate can be driven by a fake in
//! tests and by [`CpalMicrophone`] in the binary.
//!
//! ```text
//! ensure() ──cached?──▶ return status
//!    │
//!    └─ query() ── Granted / Denied ─────────────▶ cache
//!          └──── Prompt / no query API ─▶ probe() ─▶ cache
//! ```

pub mod gate;
pub mod microphone;

pub use gate::PermissionGate;
pub use microphone::CpalMicrophone;

use thiserror::Error;

// ---------------------------------------------------------------------------
// PermissionStatus
// ---------------------------------------------------------------------------

/// Cached microphone authorisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Not checked yet.
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

// ---------------------------------------------------------------------------
// SystemPermission
// ---------------------------------------------------------------------------

/// Answer of a non-prompting system permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPermission {
    Granted,
    Denied,
    /// The user has not decided yet; a probe will show a prompt.
    Prompt,
}

// ---------------------------------------------------------------------------
// AccessError
// ---------------------------------------------------------------------------

/// Why a transient microphone probe failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The user or the OS refused access to the input device.
    #[error("microphone access denied: {0}")]
    Denied(String),

    /// No input device is present.
    #[error("no microphone found")]
    NoDevice,

    /// The device exists but could not be opened.
    #[error("microphone unavailable: {0}")]
    Device(String),
}

// ---------------------------------------------------------------------------
// MicrophoneAccess trait
// ---------------------------------------------------------------------------

/// Platform permission service.
pub trait MicrophoneAccess: Send {
    /// Non-prompting permission query.  Returns `None` when the platform has
    /// no query API, in which case the gate falls back to [`probe`].
    ///
    /// [`probe`]: MicrophoneAccess::probe
    fn query(&self) -> Option<SystemPermission>;

    /// Open the microphone (prompting the user if needed) and release it
    /// again before returning.  Implementations must never keep the device
    /// open past this call.
    fn probe(&self) -> Result<(), AccessError>;
}

// ---------------------------------------------------------------------------
// MockMicrophone  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockMicrophone;
