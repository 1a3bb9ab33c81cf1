//! The TimeKeeper: one tick loop per formation, driven by
//! `tokio::time::sleep`, with pause/resume modeled as the loop awaiting
//! a [`Notify`] rather than the task being cancelled and recreated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cyre_core::{DurationMs, Repeat, TimeKeeperError};
use futures::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::formation::FormationState;

/// The historical 32-bit-millisecond `setTimeout` ceiling this engine's
/// scheduling model inherits: the longest duration a single
/// `tokio::time::sleep` call is allowed to cover before TimeKeeper
/// splits the wait into consecutive chunks.
pub const MAX_SINGLE_SLEEP: Duration = Duration::from_millis(u32::MAX as u64);

/// A scheduled unit of work: "call this, then sleep, then call it again."
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Current stress factor in `[0, 1]`, sampled fresh before each interval
/// is armed so breathing pressure lengthens (never shortens) the cadence.
pub type StressFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// A handle to a registered formation; cheap to clone, lets the engine
/// query status without going through the TimeKeeper's registry lock.
#[derive(Clone)]
pub struct FormationHandle {
    /// Shared formation state.
    pub state: Arc<FormationState>,
}

struct Entry {
    state: Arc<FormationState>,
    notify: Arc<Notify>,
    join: JoinHandle<()>,
}

/// Owns every active formation's tick loop.
#[derive(Default)]
pub struct TimeKeeper {
    formations: Mutex<HashMap<String, Entry>>,
}

impl TimeKeeper {
    /// Create an empty TimeKeeper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new formation. `delay = 0` runs the first tick
    /// immediately (same asynchronous tick); subsequent ticks are spaced
    /// `interval` apart, scaled by the current stress factor.
    pub fn keep(
        &self,
        id: impl Into<String>,
        delay: DurationMs,
        interval: DurationMs,
        repeat: Repeat,
        tick: TickFn,
        stress: Option<StressFn>,
    ) -> Result<FormationHandle, TimeKeeperError> {
        if matches!(repeat, Repeat::Times(0)) {
            return Err(TimeKeeperError::ZeroRepeat);
        }

        let id = id.into();
        let state = FormationState::new(repeat, false);
        let notify = Arc::new(Notify::new());

        let handle = FormationHandle {
            state: Arc::clone(&state),
        };

        let loop_state = Arc::clone(&state);
        let loop_notify = Arc::clone(&notify);
        let loop_id = id.clone();
        let join = tokio::spawn(async move {
            run_formation(loop_id, loop_state, loop_notify, delay, interval, tick, stress).await;
        });

        let mut formations = self.formations.lock().unwrap();
        formations.insert(
            id,
            Entry {
                state,
                notify,
                join,
            },
        );

        Ok(handle)
    }

    /// Cancel a formation outright, aborting its tick loop. Returns
    /// `false` if no formation is registered under this id.
    pub fn forget(&self, id: &str) -> bool {
        let mut formations = self.formations.lock().unwrap();
        match formations.remove(id) {
            Some(entry) => {
                entry.state.cancel();
                entry.join.abort();
                true
            }
            None => false,
        }
    }

    /// Pause one formation, or every formation when `id` is `None`.
    pub fn pause(&self, id: Option<&str>) {
        let formations = self.formations.lock().unwrap();
        match id {
            Some(id) => {
                if let Some(entry) = formations.get(id) {
                    entry.state.set_paused(true);
                }
            }
            None => {
                for entry in formations.values() {
                    entry.state.set_paused(true);
                }
            }
        }
    }

    /// Resume one formation, or every formation when `id` is `None`,
    /// waking its tick loop out of the paused `Notify` wait.
    pub fn resume(&self, id: Option<&str>) {
        let formations = self.formations.lock().unwrap();
        match id {
            Some(id) => {
                if let Some(entry) = formations.get(id) {
                    entry.state.set_paused(false);
                    entry.notify.notify_waiters();
                }
            }
            None => {
                for entry in formations.values() {
                    entry.state.set_paused(false);
                    entry.notify.notify_waiters();
                }
            }
        }
    }

    /// Look up a formation's handle without affecting its state.
    pub fn get(&self, id: &str) -> Option<FormationHandle> {
        let formations = self.formations.lock().unwrap();
        formations.get(id).map(|e| FormationHandle {
            state: Arc::clone(&e.state),
        })
    }

    /// Abort every formation's tick loop. Called from the engine's
    /// `shutdown()`.
    pub fn shutdown(&self) {
        let mut formations = self.formations.lock().unwrap();
        for (_, entry) in formations.drain() {
            entry.state.cancel();
            entry.join.abort();
        }
    }

    /// A schedulable sleep, independent of any formation. Per the
    /// documented contract, there is no cancellation path for a `wait` —
    /// dropping the returned future simply abandons interest in its
    /// result, it does not stop the clock — so unlike `keep`, this does
    /// not register a registry entry `forget` could cancel.
    pub async fn wait(&self, ms: DurationMs) {
        sleep_chunked(ms.to_std()).await;
    }
}

/// Sleep `total`, splitting into [`MAX_SINGLE_SLEEP`]-sized chunks when
/// it exceeds that ceiling.
async fn sleep_chunked(total: Duration) {
    let mut remaining = total;
    while remaining > MAX_SINGLE_SLEEP {
        tokio::time::sleep(MAX_SINGLE_SLEEP).await;
        remaining -= MAX_SINGLE_SLEEP;
    }
    tokio::time::sleep(remaining).await;
}

/// Sleep `total` on behalf of a formation, marking it `chunked` for the
/// duration of a multi-segment wait and bailing early if cancelled
/// between segments.
async fn sleep_chunked_for(total: Duration, state: &FormationState) {
    if total <= MAX_SINGLE_SLEEP {
        tokio::time::sleep(total).await;
        return;
    }
    state.mark_chunked(true);
    let mut remaining = total;
    while remaining > MAX_SINGLE_SLEEP {
        tokio::time::sleep(MAX_SINGLE_SLEEP).await;
        if state.is_cancelled() {
            return;
        }
        remaining -= MAX_SINGLE_SLEEP;
    }
    tokio::time::sleep(remaining).await;
    state.mark_chunked(false);
}

async fn wait_out_pause(state: &FormationState, notify: &Notify) {
    while state.is_paused() {
        notify.notified().await;
    }
}

async fn run_formation(
    id: String,
    state: Arc<FormationState>,
    notify: Arc<Notify>,
    delay: DurationMs,
    interval: DurationMs,
    tick: TickFn,
    stress: Option<StressFn>,
) {
    let mut first = true;
    loop {
        if state.is_cancelled() {
            return;
        }
        wait_out_pause(&state, &notify).await;
        if state.is_cancelled() {
            return;
        }

        let wait = if first {
            first = false;
            delay.to_std()
        } else {
            let factor = stress.as_ref().map(|f| f()).unwrap_or(0.0);
            interval.scaled(1.0 + factor.max(0.0)).to_std()
        };

        if !wait.is_zero() {
            sleep_chunked_for(wait, &state).await;
        }
        if state.is_cancelled() {
            return;
        }
        wait_out_pause(&state, &notify).await;
        if state.is_cancelled() {
            return;
        }

        if let Err(message) = tick().await {
            tracing::debug!(formation = %id, error = %message, "timekeeper.tick.error");
        }

        if state.tick() {
            state.complete();
            return;
        }
    }
}
