//! Raw indicator sampling and normalization.
//!
//! Four raw signals are combined: CPU, resident memory, scheduler lag
//! (the Rust stand-in for "event-loop lag" — there is no portable
//! equivalent, so this measures how late a fixed-cadence tick fires
//! relative to when it was scheduled), and call rate. Each is
//! normalized to `[0, 1]` against a configurable ceiling, mirroring the
//! pattern of normalizing heterogeneous signals (cost, tokens, turns)
//! against budgets before a single policy decision is made from them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Ceilings each raw indicator is normalized against. Defaults are
/// conservative single-process guesses; callers measuring a real
/// workload should override them.
#[derive(Debug, Clone, Copy)]
pub struct Ceilings {
    /// CPU utilization fraction (`1.0` = one fully saturated core) above
    /// which the CPU indicator reports `1.0`.
    pub cpu: f64,
    /// Resident memory in bytes above which the memory indicator
    /// reports `1.0`.
    pub memory_bytes: u64,
    /// Scheduler lag in milliseconds above which the lag indicator
    /// reports `1.0`.
    pub scheduler_lag_ms: u64,
    /// Calls per sampling window above which the call-rate indicator
    /// reports `1.0`.
    pub call_rate: u64,
}

impl Default for Ceilings {
    fn default() -> Self {
        Self {
            cpu: 0.8,
            memory_bytes: 512 * 1024 * 1024,
            scheduler_lag_ms: 50,
            call_rate: 1000,
        }
    }
}

/// One sample of every raw indicator, already normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalized {
    /// Normalized CPU indicator.
    pub cpu: f64,
    /// Normalized memory indicator.
    pub memory: f64,
    /// Normalized scheduler-lag indicator.
    pub scheduler_lag: f64,
    /// Normalized call-rate indicator.
    pub call_rate: f64,
}

impl Normalized {
    /// Combine indicators by weighted maximum — the worst offender
    /// (after weighting) sets the stress score, rather than averaging
    /// signals that can mask one indicator spiking.
    pub fn weighted_max_stress(&self, weights: &Weights) -> f64 {
        [
            self.cpu * weights.cpu,
            self.memory * weights.memory,
            self.scheduler_lag * weights.scheduler_lag,
            self.call_rate * weights.call_rate,
        ]
        .into_iter()
        .fold(0.0_f64, f64::max)
        .clamp(0.0, 1.0)
    }
}

/// Per-indicator weights applied before taking the maximum.
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    /// Weight applied to the CPU indicator.
    pub cpu: f64,
    /// Weight applied to the memory indicator.
    pub memory: f64,
    /// Weight applied to the scheduler-lag indicator.
    pub scheduler_lag: f64,
    /// Weight applied to the call-rate indicator.
    pub call_rate: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            cpu: 1.0,
            memory: 0.8,
            scheduler_lag: 1.0,
            call_rate: 0.6,
        }
    }
}

fn normalize(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (value / ceiling).clamp(0.0, 1.0)
}

/// CPU utilization since the last call, as a fraction of one core.
/// Reads `/proc/stat` deltas on Linux; `0.0` everywhere else.
pub fn sample_cpu(previous: &mut Option<(u64, u64)>) -> f64 {
    #[cfg(target_os = "linux")]
    {
        if let Some((idle, total)) = read_proc_stat() {
            let result = match previous {
                Some((prev_idle, prev_total)) => {
                    let idle_delta = idle.saturating_sub(*prev_idle) as f64;
                    let total_delta = total.saturating_sub(*prev_total) as f64;
                    if total_delta <= 0.0 {
                        0.0
                    } else {
                        (1.0 - idle_delta / total_delta).clamp(0.0, 1.0)
                    }
                }
                None => 0.0,
            };
            *previous = Some((idle, total));
            return result;
        }
    }
    let _ = previous;
    0.0
}

#[cfg(target_os = "linux")]
fn read_proc_stat() -> Option<(u64, u64)> {
    let contents = std::fs::read_to_string("/proc/stat").ok()?;
    let line = contents.lines().next()?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3];
    let total: u64 = fields.iter().sum();
    Some((idle, total))
}

/// Resident set size in bytes. Reads `/proc/self/statm` on Linux; `0`
/// everywhere else.
pub fn sample_memory_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(pages) = contents.split_whitespace().nth(1) {
                if let Ok(pages) = pages.parse::<u64>() {
                    let page_size = 4096u64;
                    return pages * page_size;
                }
            }
        }
    }
    0
}

/// Scheduler lag: how much later than `expected_interval` the current
/// tick actually fired.
pub fn scheduler_lag(actual: Duration, expected_interval: Duration) -> Duration {
    actual.saturating_sub(expected_interval)
}

/// A rolling count of calls observed since the last sample, fed by the
/// dispatch executor via [`CallRateTracker::record`].
#[derive(Default)]
pub struct CallRateTracker {
    count: AtomicU64,
}

impl CallRateTracker {
    /// Record one call.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset the count since the last sample.
    pub fn take(&self) -> u64 {
        self.count.swap(0, Ordering::Relaxed)
    }
}

/// Normalize one round of raw samples against `ceilings`.
pub fn normalize_all(
    cpu: f64,
    memory_bytes: u64,
    lag: Duration,
    call_rate: u64,
    ceilings: &Ceilings,
) -> Normalized {
    Normalized {
        cpu: normalize(cpu, ceilings.cpu),
        memory: normalize(memory_bytes as f64, ceilings.memory_bytes as f64),
        scheduler_lag: normalize(lag.as_millis() as f64, ceilings.scheduler_lag_ms as f64),
        call_rate: normalize(call_rate as f64, ceilings.call_rate as f64),
    }
}
