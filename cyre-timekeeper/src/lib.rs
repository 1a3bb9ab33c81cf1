//! # cyre-timekeeper — recurring and delayed scheduling
//!
//! [`TimeKeeper`] owns one tick loop per registered [`formation::Status`],
//! driven by `tokio::time::sleep`. Pause/resume suspends a loop on a
//! [`tokio::sync::Notify`] instead of tearing the task down, so a
//! resumed formation keeps its remaining execution count. Waits longer
//! than [`MAX_SINGLE_SLEEP`] are split into consecutive chunks rather
//! than handed to a single `sleep` call.

#![deny(missing_docs)]

mod formation;
mod keeper;

pub use formation::{FormationState, Status};
pub use keeper::{FormationHandle, StressFn, TickFn, TimeKeeper, MAX_SINGLE_SLEEP};
