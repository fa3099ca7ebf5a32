//! Cached microphone permission check.

use super::{AccessError, MicrophoneAccess, PermissionStatus, SystemPermission};

/// Acquires and caches microphone authorisation.
///
/// The first [`ensure`](Self::ensure) call does the work; later calls return
/// the cached answer without touching the device.  A `Denied` answer is
/// never retried automatically: the caller must ask again through
/// [`recheck`](Self::recheck).
pub struct PermissionGate {
    access: Box<dyn MicrophoneAccess>,
    status: PermissionStatus,
    /// Reason for the most recent refusal, shown to the user.
    failure: Option<String>,
}

impl PermissionGate {
    pub fn new(access: Box<dyn MicrophoneAccess>) -> Self {
        Self {
            access,
            status: PermissionStatus::Unknown,
            failure: None,
        }
    }

    /// Current cached status (never probes).
    pub fn status(&self) -> PermissionStatus {
        self.status
    }

    /// Human-readable reason for the last `Denied` answer.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Consult the non-prompting system query only.
    ///
    /// Used at construction so the controller can start in
    /// `PermissionRequired` when access is already known to be refused.
    /// A definite answer is cached; `Prompt` leaves the status `Unknown`.
    pub fn peek(&mut self) -> PermissionStatus {
        if self.status == PermissionStatus::Unknown {
            match self.access.query() {
                Some(SystemPermission::Granted) => self.cache(PermissionStatus::Granted, None),
                Some(SystemPermission::Denied) => self.cache(
                    PermissionStatus::Denied,
                    Some("microphone access is blocked in system settings".into()),
                ),
                Some(SystemPermission::Prompt) | None => {}
            }
        }
        self.status
    }

    /// Return `Granted` or `Denied`, probing the device at most once per
    /// cached answer.
    pub fn ensure(&mut self) -> PermissionStatus {
        if self.status != PermissionStatus::Unknown {
            return self.status;
        }

        match self.access.query() {
            Some(SystemPermission::Granted) => {
                self.cache(PermissionStatus::Granted, None);
            }
            Some(SystemPermission::Denied) => {
                self.cache(
                    PermissionStatus::Denied,
                    Some("microphone access is blocked in system settings".into()),
                );
            }
            Some(SystemPermission::Prompt) | None => self.probe(),
        }

        self.status
    }

    /// Drop the cached answer and ask again.
    ///
    /// Unlike [`ensure`](Self::ensure), a `Denied` system query does not
    /// short-circuit: the device is probed so the platform can prompt.
    pub fn recheck(&mut self) -> PermissionStatus {
        self.status = PermissionStatus::Unknown;
        self.failure = None;

        if self.access.query() == Some(SystemPermission::Granted) {
            self.cache(PermissionStatus::Granted, None);
        } else {
            self.probe();
        }
        self.status
    }

    /// Record a mid-session revocation reported by the recognition engine.
    pub fn revoke(&mut self, reason: impl Into<String>) {
        self.cache(PermissionStatus::Denied, Some(reason.into()));
    }

    fn probe(&mut self) {
        match self.access.probe() {
            Ok(()) => {
                log::info!("permission: microphone probe succeeded");
                self.cache(PermissionStatus::Granted, None);
            }
            Err(e) => {
                log::warn!("permission: microphone probe failed: {e}");
                let reason = match &e {
                    AccessError::Denied(_) => e.to_string(),
                    AccessError::NoDevice | AccessError::Device(_) => {
                        format!("{e} (check that a microphone is connected)")
                    }
                };
                self.cache(PermissionStatus::Denied, Some(reason));
            }
        }
    }

    fn cache(&mut self, status: PermissionStatus, failure: Option<String>) {
        log::debug!("permission: {:?} -> {:?}", self.status, status);
        self.status = status;
        self.failure = failure;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
