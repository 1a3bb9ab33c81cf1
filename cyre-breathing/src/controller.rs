//! The breathing controller: a background sampler publishing
//! [`BreathingState`] snapshots through a `tokio::sync::watch` channel,
//! the same read-only-snapshot shape used for a system-wide
//! observability event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::indicators::{self, Ceilings, Weights};
use crate::state::{BreathingState, Pattern, MAX_RATE_MS, RECOVERY_THRESHOLD};

/// Base sampling cadence.
pub const BASE_MS: u64 = 200;

/// Multiplicative growth applied to `current_rate_ms` each tick spent
/// in [`Pattern::Recovery`], capped at [`MAX_RATE_MS`].
const COOLDOWN_GROWTH: f64 = 1.2;

/// Owns the sampling task and the latest published [`BreathingState`].
pub struct BreathingController {
    rx: watch::Receiver<BreathingState>,
    tx: watch::Sender<BreathingState>,
    calls: Arc<indicators::CallRateTracker>,
    ceilings: Ceilings,
    weights: Weights,
    join: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BreathingController {
    /// Build a controller with default ceilings/weights. Sampling does
    /// not start until [`BreathingController::start`] is called.
    pub fn new() -> Self {
        Self::with_config(Ceilings::default(), Weights::default())
    }

    /// Build a controller with explicit ceilings and weights.
    pub fn with_config(ceilings: Ceilings, weights: Weights) -> Self {
        let (tx, rx) = watch::channel(BreathingState::default());
        Self {
            rx,
            tx,
            calls: Arc::new(indicators::CallRateTracker::default()),
            ceilings,
            weights,
            join: std::sync::Mutex::new(None),
        }
    }

    /// A handle the dispatch executor feeds one `record()` per call so
    /// the call-rate indicator reflects live traffic.
    pub fn call_tracker(&self) -> Arc<indicators::CallRateTracker> {
        Arc::clone(&self.calls)
    }

    /// Cheap, lock-free read of the latest published snapshot.
    pub fn state(&self) -> BreathingState {
        *self.rx.borrow()
    }

    /// Start the background sampling loop. Idempotent: calling twice
    /// replaces the previous task.
    pub fn start(&self) {
        let tx = self.tx.clone();
        let calls = Arc::clone(&self.calls);
        let ceilings = self.ceilings;
        let weights = self.weights;

        let handle = tokio::spawn(async move {
            let base = Duration::from_millis(BASE_MS);
            let mut ticker = tokio::time::interval(base);
            let mut cpu_prev = None;
            let mut current_rate_ms = BASE_MS;

            loop {
                let scheduled_at = Instant::now();
                ticker.tick().await;
                let lag = indicators::scheduler_lag(scheduled_at.elapsed(), base);

                let cpu = indicators::sample_cpu(&mut cpu_prev);
                let memory = indicators::sample_memory_bytes();
                let call_rate = calls.take();

                let normalized =
                    indicators::normalize_all(cpu, memory, lag, call_rate, &ceilings);
                let stress = normalized.weighted_max_stress(&weights);

                let pattern = if stress >= RECOVERY_THRESHOLD {
                    Pattern::Recovery
                } else {
                    Pattern::Normal
                };

                current_rate_ms = match pattern {
                    Pattern::Recovery => {
                        ((current_rate_ms as f64 * COOLDOWN_GROWTH) as u64).min(MAX_RATE_MS)
                    }
                    Pattern::Normal => BASE_MS,
                };

                let next = BreathingState {
                    stress,
                    pattern,
                    current_rate_ms,
                    recuperating: pattern == Pattern::Recovery,
                };

                tracing::debug!(stress, ?pattern, current_rate_ms, "breathing.sample");

                if tx.send(next).is_err() {
                    return;
                }
            }
        });

        let mut join = self.join.lock().unwrap();
        if let Some(previous) = join.replace(handle) {
            previous.abort();
        }
    }

    /// Whether new registrations are currently admitted (see
    /// [`BreathingState::can_register`]).
    pub fn can_register(&self, locked: bool) -> bool {
        self.state().can_register(locked)
    }

    /// Stop the sampling loop.
    pub fn shutdown(&self) {
        if let Some(handle) = self.join.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Default for BreathingController {
    fn default() -> Self {
        Self::new()
    }
}

