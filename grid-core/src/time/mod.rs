//! TimeProvider (C1) — monotonic and wall-clock time, swappable for
//! simulated time so cooldowns and schedules behave identically live and
//! backtested.

use crate::core::KernelError;
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::time::Instant;

/// Capability set shared by the live and backtest time sources.
///
/// `monotonic` is used for cooldown timers (strategy-switch cooldown,
/// trailing-grid shift cooldown) precisely because it cannot be skipped by
/// pausing and resuming the process, and because the backtest variant can
/// derive it from simulated time rather than real elapsed wall time.
pub trait TimeProvider: Send + Sync {
    /// Current UTC instant.
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic seconds since this provider's own epoch. Not comparable
    /// across providers or process restarts — only deltas are meaningful.
    fn monotonic(&self) -> f64;

    /// UNIX timestamp (seconds) of `now`.
    fn timestamp(&self) -> f64 {
        self.now().timestamp() as f64 + self.now().timestamp_subsec_nanos() as f64 / 1e9
    }
}

/// Production time provider. Both methods read the OS clock directly.
pub struct LiveTimeProvider {
    start: Instant,
    start_utc: DateTime<Utc>,
}

impl LiveTimeProvider {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_utc: Utc::now(),
        }
    }
}

impl Default for LiveTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for LiveTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Simulated time provider for backtesting.
///
/// Single-threaded per run — the backtest loop is strictly synchronous —
/// so interior mutability via `Cell` is sufficient — no lock is needed and
/// none is taken.
pub struct BacktestTimeProvider {
    current: Cell<DateTime<Utc>>,
    start_ts: f64,
}

impl BacktestTimeProvider {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Cell::new(start),
            start_ts: start.timestamp() as f64,
        }
    }

    /// Advance simulated time by `delta`. Errors when `delta <= 0`.
    pub fn advance(&self, delta: chrono::Duration) -> Result<(), KernelError> {
        if delta <= chrono::Duration::zero() {
            return Err(KernelError::invalid_config(format!(
                "advance() requires positive delta, got {delta}"
            )));
        }
        self.current.set(self.current.get() + delta);
        Ok(())
    }

    /// Advance by `n` bars of `bar_duration_secs` each.
    pub fn advance_bars(&self, n: i64, bar_duration_secs: i64) -> Result<(), KernelError> {
        self.advance(chrono::Duration::seconds(n * bar_duration_secs))
    }

    /// Teleport to an absolute instant (used when seeding from the first
    /// candle of a backtest run).
    pub fn set_time(&self, dt: DateTime<Utc>) {
        self.current.set(dt);
    }
}

impl TimeProvider for BacktestTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.current.get()
    }

    fn monotonic(&self) -> f64 {
        self.current.get().timestamp() as f64 - self.start_ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn advance_moves_now_forward() {
        let p = BacktestTimeProvider::new(start());
        p.advance(chrono::Duration::minutes(5)).unwrap();
        assert_eq!(p.now(), start() + chrono::Duration::minutes(5));
    }

    #[test]
    fn advance_rejects_non_positive_delta() {
        let p = BacktestTimeProvider::new(start());
        assert!(p.advance(chrono::Duration::zero()).is_err());
        assert!(p.advance(chrono::Duration::seconds(-1)).is_err());
    }

    #[test]
    fn monotonic_derives_from_simulated_now() {
        let p = BacktestTimeProvider::new(start());
        assert_eq!(p.monotonic(), 0.0);
        p.advance_bars(3, 300).unwrap();
        assert_eq!(p.monotonic(), 900.0);
    }

    #[test]
    fn monotonic_survives_pause_resume_semantics() {
        // Cooldowns measured in monotonic deltas must not be skippable by
        // advancing wall clock externally; here we just assert two
        // providers starting at the same instant agree.
        let a = BacktestTimeProvider::new(start());
        let b = BacktestTimeProvider::new(start());
        a.advance(chrono::Duration::seconds(10)).unwrap();
        b.advance(chrono::Duration::seconds(10)).unwrap();
        assert_eq!(a.monotonic(), b.monotonic());
    }
}
