//! Redraw cadence
//!
//! [`UpdateScheduler`] turns a stream of "data changed" notifications into
//! redraw decisions. It never draws anything itself and never touches series
//! data; the session asks it when to draw and then takes a snapshot.
//!
//! All methods take the current time as a parameter so the policy can be
//! driven deterministically.
//!
//! At most one redraw is ever pending. Notifications that arrive while one
//! is pending are absorbed; there is no backlog.

use crate::config::{RedrawPolicy, IMMEDIATE_REDRAW_DELAY};
use std::time::{Duration, Instant};

/// Decides when a redraw should run
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    policy: RedrawPolicy,
    /// When the single outstanding redraw is due
    pending: Option<Instant>,
    /// When the last fixed-rate redraw was granted
    last_redraw: Option<Instant>,
}

impl UpdateScheduler {
    /// Create an idle scheduler
    pub fn new(policy: RedrawPolicy) -> Self {
        Self {
            policy,
            pending: None,
            last_redraw: None,
        }
    }

    /// Active policy
    pub fn policy(&self) -> RedrawPolicy {
        self.policy
    }

    /// Record that the data changed at `now`.
    ///
    /// Returns `true` if this notification scheduled a redraw, `false` if it
    /// was absorbed by a pending one or dropped by the rate limit.
    pub fn notify_changed(&mut self, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match self.policy {
            RedrawPolicy::Immediate => {
                self.pending = Some(now + IMMEDIATE_REDRAW_DELAY);
                true
            }
            RedrawPolicy::FixedRate { interval } => {
                let due = self
                    .last_redraw
                    .map_or(true, |last| now.saturating_duration_since(last) >= interval);
                if due {
                    self.pending = Some(now);
                    self.last_redraw = Some(now);
                } else {
                    tracing::trace!("Redraw signal dropped by fixed-rate limit");
                }
                due
            }
        }
    }

    /// Schedule a redraw at `now` regardless of policy, unless one is pending.
    ///
    /// Used when the display must change even though no sample arrived.
    pub fn request_redraw(&mut self, now: Instant) {
        if self.pending.is_none() {
            self.pending = Some(now);
            if matches!(self.policy, RedrawPolicy::FixedRate { .. }) {
                self.last_redraw = Some(now);
            }
        }
    }

    /// Take the pending redraw if it is due at `now`.
    ///
    /// Returns `true` exactly once per scheduled redraw.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(due) if now >= due => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// When the pending redraw is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Time left until the pending redraw, zero if already due
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending.map(|due| due.saturating_duration_since(now))
    }

    /// Whether a redraw is outstanding
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget any pending redraw and rate-limit history
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_redraw = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_immediate_coalesces_burst() {
        let t0 = Instant::now();
        let mut scheduler = UpdateScheduler::new(RedrawPolicy::Immediate);

        assert!(scheduler.notify_changed(t0));
        for k in 1..50 {
            assert!(!scheduler.notify_changed(t0 + MS * k / 10));
        }
        assert!(!scheduler.poll(t0 + 9 * MS));
        assert!(scheduler.poll(t0 + 10 * MS));
        assert!(!scheduler.poll(t0 + 11 * MS));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_immediate_rearms_after_redraw() {
        let t0 = Instant::now();
        let mut scheduler = UpdateScheduler::new(RedrawPolicy::Immediate);
        scheduler.notify_changed(t0);
        assert!(scheduler.poll(t0 + 10 * MS));

        assert!(scheduler.notify_changed(t0 + 12 * MS));
        assert_eq!(scheduler.next_deadline(), Some(t0 + 22 * MS));
    }

    #[test]
    fn test_fixed_rate_limits_burst() {
        let t0 = Instant::now();
        let interval = 100 * MS;
        let mut scheduler = UpdateScheduler::new(RedrawPolicy::FixedRate { interval });

        // First signal redraws right away
        assert!(scheduler.notify_changed(t0));
        assert!(scheduler.poll(t0));

        // Burst inside the interval is dropped
        for k in 1..100 {
            assert!(!scheduler.notify_changed(t0 + MS * k));
        }
        assert!(!scheduler.poll(t0 + 99 * MS));

        // Boundary is inclusive
        assert!(scheduler.notify_changed(t0 + interval));
        assert!(scheduler.poll(t0 + interval));
    }

    #[test]
    fn test_fixed_rate_after_idle_is_immediate() {
        let t0 = Instant::now();
        let mut scheduler =
            UpdateScheduler::new(RedrawPolicy::FixedRate { interval: 50 * MS });
        scheduler.notify_changed(t0);
        scheduler.poll(t0);

        let later = t0 + Duration::from_secs(5);
        assert!(scheduler.notify_changed(later));
        assert_eq!(scheduler.time_until_due(later), Some(Duration::ZERO));
    }

    #[test]
    fn test_fixed_rate_pending_absorbs_signals() {
        let t0 = Instant::now();
        let mut scheduler =
            UpdateScheduler::new(RedrawPolicy::FixedRate { interval: 10 * MS });
        assert!(scheduler.notify_changed(t0));
        // Not yet polled; later signals must not queue a second redraw
        assert!(!scheduler.notify_changed(t0 + 20 * MS));
        assert!(scheduler.poll(t0 + 20 * MS));
        assert!(!scheduler.poll(t0 + 40 * MS));
    }

    #[test]
    fn test_request_redraw_and_reset() {
        let t0 = Instant::now();
        let mut scheduler = UpdateScheduler::new(RedrawPolicy::Immediate);
        scheduler.request_redraw(t0);
        assert!(scheduler.poll(t0));

        scheduler.notify_changed(t0);
        scheduler.reset();
        assert!(!scheduler.is_pending());
        assert!(!scheduler.poll(t0 + Duration::from_secs(1)));
    }
}
