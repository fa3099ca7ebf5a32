//! Global hotkeys for the controller's manual actions, backed by `rdev`.
//!
//! Two keys are bound: one starts a command capture while awake, the other
//! sends the controller to sleep.  Presses are posted into the controller's
//! event channel as [`Action`]s.
//!
//! `rdev::listen()` blocks forever, so [`HotkeyListener::start`] runs it on a
//! dedicated OS thread.

pub mod listener;

pub use listener::HotkeyListener;

use crate::config::HotkeyConfig;
use crate::controller::Action;

// ---------------------------------------------------------------------------
// HotkeyBindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub capture: rdev::Key,
    pub sleep: rdev::Key,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            capture: rdev::Key::F9,
            sleep: rdev::Key::F10,
        }
    }
}

impl HotkeyBindings {
    /// Resolve the configured key names.  Unknown names fall back to the
    /// default binding with a warning.
    pub fn from_config(config: &HotkeyConfig) -> Self {
        let defaults = Self::default();
        Self {
            capture: resolve(&config.capture_key, defaults.capture),
            sleep: resolve(&config.sleep_key, defaults.sleep),
        }
    }

    /// Action bound to `key`, if any.
    pub fn action_for(&self, key: rdev::Key) -> Option<Action> {
        if key == self.capture {
            Some(Action::CaptureCommand)
        } else if key == self.sleep {
            Some(Action::GoToSleep)
        } else {
            None
        }
    }
}

fn resolve(name: &str, fallback: rdev::Key) -> rdev::Key {
    parse_key(name).unwrap_or_else(|| {
        log::warn!("unknown hotkey {name:?}; using {fallback:?}");
        fallback
    })
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

const FUNCTION_KEYS: [rdev::Key; 12] = [
    rdev::Key::F1,
    rdev::Key::F2,
    rdev::Key::F3,
    rdev::Key::F4,
    rdev::Key::F5,
    rdev::Key::F6,
    rdev::Key::F7,
    rdev::Key::F8,
    rdev::Key::F9,
    rdev::Key::F10,
    rdev::Key::F11,
    rdev::Key::F12,
];

const LETTER_KEYS: [rdev::Key; 26] = [
    rdev::Key::KeyA,
    rdev::Key::KeyB,
    rdev::Key::KeyC,
    rdev::Key::KeyD,
    rdev::Key::KeyE,
    rdev::Key::KeyF,
    rdev::Key::KeyG,
    rdev::Key::KeyH,
    rdev::Key::KeyI,
    rdev::Key::KeyJ,
    rdev::Key::KeyK,
    rdev::Key::KeyL,
    rdev::Key::KeyM,
    rdev::Key::KeyN,
    rdev::Key::KeyO,
    rdev::Key::KeyP,
    rdev::Key::KeyQ,
    rdev::Key::KeyR,
    rdev::Key::KeyS,
    rdev::Key::KeyT,
    rdev::Key::KeyU,
    rdev::Key::KeyV,
    rdev::Key::KeyW,
    rdev::Key::KeyX,
    rdev::Key::KeyY,
    rdev::Key::KeyZ,
];

/// Parse a key name from the config file into an [`rdev::Key`].
///
/// Accepts `F1`–`F12`, a handful of named keys and single ASCII letters
/// (either case).  Returns `None` for anything else.
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<usize>().ok()) {
        return n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i)).copied();
    }

    let key = match name {
        "Escape" | "Esc" => rdev::Key::Escape,
        "Space" => rdev::Key::Space,
        "Return" | "Enter" => rdev::Key::Return,
        "Tab" => rdev::Key::Tab,
        "Pause" => rdev::Key::Pause,
        "ScrollLock" => rdev::Key::ScrollLock,
        "Home" => rdev::Key::Home,
        "End" => rdev::Key::End,
        _ => {
            let mut chars = name.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return None;
            };
            if !c.is_ascii_alphabetic() {
                return None;
            }
            let index = (c.to_ascii_lowercase() as u8 - b'a') as usize;
            LETTER_KEYS[index]
        }
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
