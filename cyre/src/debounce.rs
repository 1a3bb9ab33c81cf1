//! Debounce bookkeeping (protection-pipeline step 8).
//!
//! Not a [`cyre_pipeline::Talent`] — debounce needs a generation counter
//! and a deferred dispatch task per channel, state this crate's engine
//! owns but the stateless `cyre-pipeline` crate deliberately does not.

use serde_json::Value;

/// The in-flight state of one debounce burst.
pub struct DebounceBurst {
    /// Incremented on every admitted call during the burst; a deferred
    /// dispatch task only fires if the generation it captured is still
    /// current when its sleep completes — this is the "a pending timer
    /// replaces any previous pending timer" reset, implemented without
    /// actually cancelling the superseded task.
    pub generation: u64,
    /// The payload from the most recently admitted call in this burst.
    pub pending_payload: Value,
    /// Engine-clock milliseconds when the first call in this burst was
    /// admitted; the basis for `max_wait`.
    pub first_call_at: u64,
    /// Whether a `max_wait` timer has already been armed for this burst.
    pub max_wait_armed: bool,
}
