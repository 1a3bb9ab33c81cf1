//! The Clock capability — monotonic "now", injectable for tests.

use std::sync::Arc;
use std::time::Instant;

/// Protocol — monotonic time source.
///
/// Implementations:
/// - [`SystemClock`]: wraps `std::time::Instant`, the production default.
/// - `VirtualClock` (`test-utils` feature): advances on command instead of
///   wall-clock time, so debounce/throttle/TimeKeeper tests are deterministic.
///
/// The engine never reads `Instant::now()` directly outside of
/// [`SystemClock`] — every timing decision goes through this trait so a
/// test can substitute its own notion of time.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since some arbitrary but fixed epoch for this
    /// clock instance. Only deltas between two calls are meaningful.
    fn now_ms(&self) -> u64;
}

/// Production clock backed by `std::time::Instant`.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a new system clock, fixing "zero" at the current instant.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Shared handle to a clock, cloned freely across components.
pub type ClockHandle = Arc<dyn Clock>;

#[cfg(feature = "test-utils")]
pub mod test_utils {
    //! Deterministic clock double for timing-sensitive tests.

    use super::Clock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// A clock whose `now_ms()` only changes when [`VirtualClock::advance`]
    /// is called. Lets tests assert on debounce/throttle/TimeKeeper behavior
    /// without sleeping real wall-clock time.
    #[derive(Clone, Default)]
    pub struct VirtualClock {
        millis: Arc<AtomicU64>,
    }

    impl VirtualClock {
        /// Create a virtual clock starting at time zero.
        pub fn new() -> Self {
            Self::default()
        }

        /// Advance the clock by `ms` milliseconds.
        pub fn advance(&self, ms: u64) {
            self.millis.fetch_add(ms, Ordering::SeqCst);
        }

        /// Set the clock to an absolute millisecond value.
        pub fn set(&self, ms: u64) {
            self.millis.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for VirtualClock {
        fn now_ms(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }
}
