//! # cyre-breathing — the system-stress controller
//!
//! Samples CPU, memory, scheduler lag, and call-rate indicators on a
//! fixed cadence, combines them into a single stress score, and
//! publishes a [`BreathingState`] snapshot other crates can read
//! lock-free. Used to gate registration ([`BreathingState::can_register`])
//! and to stretch [`cyre_timekeeper::TimeKeeper`] intervals under load.

#![deny(missing_docs)]

mod controller;
mod indicators;
mod state;

pub use controller::{BreathingController, BASE_MS};
pub use indicators::{CallRateTracker, Ceilings, Weights};
pub use state::{BreathingState, Pattern, CRITICAL_THRESHOLD, MAX_RATE_MS, RECOVERY_THRESHOLD};
