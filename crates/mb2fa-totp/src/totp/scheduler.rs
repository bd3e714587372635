//! Refresh Scheduler — decides, once per tick, whether codes must be
//! recomputed and what countdown to show.
//!
//! Codes are recomputed when the 30-second step differs from the step they
//! were last computed for. On a 1-second cadence that is exactly the tick
//! where `remaining == period`; a host that misses that tick (sleep, a
//! stalled run loop) still refreshes on the next one.

use crate::totp::core;
use crate::totp::types::*;

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    period: u32,
    /// Step the cached codes belong to; `None` when stale.
    computed_step: Option<u64>,
}

impl RefreshScheduler {
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            computed_step: None,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Force a recompute on the next tick.
    pub fn invalidate(&mut self) {
        self.computed_step = None;
    }

    pub fn is_stale_at(&self, unix_seconds: u64) -> bool {
        self.computed_step != Some(core::time_step_at(unix_seconds, self.period))
    }

    /// Record that codes were computed at `unix_seconds`.
    pub fn mark_refreshed(&mut self, unix_seconds: u64) {
        self.computed_step = Some(core::time_step_at(unix_seconds, self.period));
    }

    /// Advance one tick. With no entries the scheduler is idle and forgets
    /// any cached step. When `refreshed` is returned the caller must
    /// recompute every code; the scheduler already counts them as fresh.
    pub fn on_tick(&mut self, unix_seconds: u64, entry_count: usize) -> TickOutcome {
        if entry_count == 0 {
            self.invalidate();
            return TickOutcome::Idle;
        }
        let remaining = core::seconds_remaining_at(unix_seconds, self.period);
        let refreshed = self.is_stale_at(unix_seconds);
        if refreshed {
            self.mark_refreshed(unix_seconds);
        }
        TickOutcome::Counting {
            remaining,
            refreshed,
        }
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(core::DEFAULT_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_without_entries() {
        let mut s = RefreshScheduler::default();
        assert_eq!(s.on_tick(300, 0), TickOutcome::Idle);
        assert_eq!(s.on_tick(301, 0), TickOutcome::Idle);
    }

    #[test]
    fn thirty_ticks_from_boundary_refresh_once() {
        let mut s = RefreshScheduler::default();
        let mut countdown = Vec::new();
        let mut refreshes = Vec::new();
        for t in 300..330u64 {
            let out = s.on_tick(t, 2);
            countdown.push(out.remaining().unwrap());
            if out.refreshed() {
                refreshes.push(t);
            }
        }
        assert_eq!(countdown, (1..=30).rev().collect::<Vec<u32>>());
        assert_eq!(refreshes, vec![300]);

        let out = s.on_tick(330, 2);
        assert_eq!(out, TickOutcome::Counting { remaining: 30, refreshed: true });
    }

    #[test]
    fn first_tick_mid_window_refreshes() {
        let mut s = RefreshScheduler::default();
        assert_eq!(
            s.on_tick(317, 1),
            TickOutcome::Counting { remaining: 13, refreshed: true }
        );
        assert!(!s.on_tick(318, 1).refreshed());
    }

    #[test]
    fn missed_boundary_tick_still_refreshes() {
        let mut s = RefreshScheduler::default();
        s.on_tick(328, 1);
        // 330 never ticked.
        assert_eq!(
            s.on_tick(332, 1),
            TickOutcome::Counting { remaining: 28, refreshed: true }
        );
    }

    #[test]
    fn mark_refreshed_suppresses_same_window() {
        let mut s = RefreshScheduler::default();
        s.mark_refreshed(305);
        assert!(!s.on_tick(306, 1).refreshed());
        s.invalidate();
        assert!(s.on_tick(307, 1).refreshed());
    }

    #[test]
    fn going_idle_forgets_cached_step() {
        let mut s = RefreshScheduler::default();
        s.on_tick(300, 1);
        s.on_tick(301, 0);
        assert!(s.on_tick(302, 1).refreshed());
    }
}
