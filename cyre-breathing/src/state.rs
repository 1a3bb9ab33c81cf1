//! The breathing state snapshot published to readers.

use serde::{Deserialize, Serialize};

/// Coarse system-pressure classification derived from the stress score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pattern {
    /// Stress below the recovery threshold; full throughput.
    Normal,
    /// Stress at or above the recovery threshold; cadence is being
    /// stretched out and new registrations may be refused at critical
    /// depth.
    Recovery,
}

/// Stress score at or above which the system enters [`Pattern::Recovery`].
pub const RECOVERY_THRESHOLD: f64 = 0.75;

/// Stress score at or above which [`BreathingState::can_register`]
/// refuses new registrations even when the system is not locked.
pub const CRITICAL_THRESHOLD: f64 = 0.9;

/// Upper bound `currentRate` grows toward while recovering.
pub const MAX_RATE_MS: u64 = 1000;

/// A read-only snapshot of the breathing controller's last sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathingState {
    /// Weighted-max stress score in `[0, 1]`.
    pub stress: f64,
    /// Derived pattern.
    pub pattern: Pattern,
    /// Current effective rate in milliseconds; grows toward
    /// [`MAX_RATE_MS`] while in [`Pattern::Recovery`], and resets to the
    /// base cadence once back to [`Pattern::Normal`].
    pub current_rate_ms: u64,
    /// Set once a recuperation interval has been entered.
    pub recuperating: bool,
}

impl Default for BreathingState {
    fn default() -> Self {
        Self {
            stress: 0.0,
            pattern: Pattern::Normal,
            current_rate_ms: crate::controller::BASE_MS,
            recuperating: false,
        }
    }
}

impl BreathingState {
    /// Whether new channel/handler registrations are currently admitted.
    /// Refused at critical recovery depth or when the caller reports the
    /// system locked.
    pub fn can_register(&self, locked: bool) -> bool {
        if locked {
            return false;
        }
        !(self.pattern == Pattern::Recovery && self.stress >= CRITICAL_THRESHOLD)
    }
}
