//! A formation: one scheduled, repeating (or one-shot) tick loop.

use cyre_core::Repeat;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A formation's lifecycle state. `Active → Paused → Active →
/// Completed|Cancelled`; `Completed`/`Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Armed and ticking.
    Active,
    /// Ticking is suspended; `remaining` is preserved.
    Paused,
    /// `remaining` reached zero; the formation has been dropped.
    Completed,
    /// `forget` was called.
    Cancelled,
}

/// Shared, lock-free state for one formation, readable by the owning
/// task's tick loop and writable by `pause`/`resume`/`forget` from any
/// thread without taking the registry lock per tick.
pub struct FormationState {
    status: AtomicU64,
    remaining: AtomicU64,
    forever: AtomicBool,
    chunked: AtomicBool,
}

const ACTIVE: u64 = 0;
const PAUSED: u64 = 1;
const COMPLETED: u64 = 2;
const CANCELLED: u64 = 3;

impl FormationState {
    /// Build the initial state for a new formation.
    pub fn new(repeat: Repeat, start_paused: bool) -> Arc<Self> {
        let (remaining, forever) = match repeat {
            Repeat::Times(n) => (n, false),
            Repeat::Forever => (0, true),
        };
        Arc::new(Self {
            status: AtomicU64::new(if start_paused { PAUSED } else { ACTIVE }),
            remaining: AtomicU64::new(remaining),
            forever: AtomicBool::new(forever),
            chunked: AtomicBool::new(false),
        })
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        match self.status.load(Ordering::SeqCst) {
            ACTIVE => Status::Active,
            PAUSED => Status::Paused,
            COMPLETED => Status::Completed,
            _ => Status::Cancelled,
        }
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        let from = if paused { ACTIVE } else { PAUSED };
        let to = if paused { PAUSED } else { ACTIVE };
        let _ = self
            .status
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub(crate) fn cancel(&self) {
        self.status.store(CANCELLED, Ordering::SeqCst);
    }

    pub(crate) fn complete(&self) {
        self.status.store(COMPLETED, Ordering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.status.load(Ordering::SeqCst) == CANCELLED
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.status.load(Ordering::SeqCst) == PAUSED
    }

    /// Decrement `remaining` for a finite formation; returns `true` if
    /// this was the last permitted execution. Forever formations never
    /// decrement and never report exhaustion.
    pub(crate) fn tick(&self) -> bool {
        if self.forever.load(Ordering::SeqCst) {
            return false;
        }
        let prev = self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| {
            Some(r.saturating_sub(1))
        });
        matches!(prev, Ok(1) | Ok(0))
    }

    pub(crate) fn mark_chunked(&self, chunked: bool) {
        self.chunked.store(chunked, Ordering::SeqCst);
    }

    /// Whether the formation's current wait was split into chunks
    /// because it exceeded [`crate::keeper::MAX_SINGLE_SLEEP`].
    pub fn is_chunked(&self) -> bool {
        self.chunked.load(Ordering::SeqCst)
    }

    /// Remaining executions, or `None` for an unbounded (`Forever`) formation.
    pub fn remaining(&self) -> Option<u64> {
        if self.forever.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.remaining.load(Ordering::SeqCst))
        }
    }
}
