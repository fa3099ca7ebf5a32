//! Hands-free voice activation: wake phrase → command capture → sleep.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod feedback;
pub mod hotkey;
pub mod permission;
pub mod recognition;
