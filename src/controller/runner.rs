//! Async driver for [`WakeController`].
//!
//! ```text
//! engine callbacks ─┐
//! timer tasks ──────┤
//! synthesizer ──────┼─▶ EventReceiver ─▶ ControllerRunner ─▶ controller.dispatch
//! chat replies ─────┤
//! hotkeys / UI ─────┘
//! ```
//!
//! The runner owns the controller, so every transition happens on one task
//! and no locking is needed around the state machine.

use super::event::{ControllerEvent, EventReceiver};
use super::machine::WakeController;

pub struct ControllerRunner {
    controller: WakeController,
}

impl ControllerRunner {
    pub fn new(controller: WakeController) -> Self {
        Self { controller }
    }

    /// Start listening, then dispatch events until [`ControllerEvent::Shutdown`]
    /// arrives or every sender is dropped.  The controller is torn down on
    /// exit either way.
    pub async fn run(mut self, mut events: EventReceiver) {
        self.controller.start_listening();

        while let Some(event) = events.recv().await {
            if event == ControllerEvent::Shutdown {
                log::info!("controller runner: shutdown requested");
                break;
            }
            self.controller.dispatch(event);
        }

        self.controller.shutdown();
        log::info!("controller runner stopped");
    }
}
