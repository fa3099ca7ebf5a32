//! Wake-phrase activation controller.
//!
//! * [`WakeController`]: the synchronous state machine.
//! * [`ControllerRunner`]: feeds it from the event channel.
//! * [`SleepTimer`] / [`Scheduler`]: inactivity timeout and retry backoff.
//! * [`ControllerSnapshot`]: read-only view for the UI layer.

pub mod event;
pub mod machine;
pub mod phrases;
pub mod runner;
pub mod state;
pub mod timer;

pub use event::{Action, ControllerEvent, EventReceiver, EventSender};
pub use machine::{Collaborators, WakeController};
pub use phrases::PhraseMatcher;
pub use runner::ControllerRunner;
pub use state::{
    new_shared_snapshot, ActivationState, ControllerSnapshot, ErrorKind, LastError,
    SharedSnapshot,
};
pub use timer::{Scheduler, SleepTimer, TimerId, TokioScheduler};

#[cfg(test)]
pub use timer::ManualScheduler;
