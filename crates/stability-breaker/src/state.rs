use crate::config::BreakerConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of checking the gate before a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The protected operation may be called.
    Permitted,
    /// The cooldown window is still running.
    ///
    /// `retry_after` is `None` when the window is too long to represent.
    Rejected { retry_after: Option<Duration> },
}

impl Admission {
    /// Returns true if the call would be rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected { .. })
    }
}

/// End of a cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cooldown {
    Until(Instant),
    /// The window overflowed; nothing short of a success reopens the gate.
    Indefinite,
}

/// Failure streak and the time of the last completed attempt.
///
/// Both fields live behind a single lock in [`crate::Breaker`] and are always
/// read and written together.
#[derive(Debug)]
pub(crate) struct FailureHistory {
    consecutive_failures: u32,
    last_attempt: Instant,
}

impl FailureHistory {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            consecutive_failures: 0,
            last_attempt: now,
        }
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub(crate) fn last_attempt(&self) -> Instant {
        self.last_attempt
    }

    /// Failures beyond the threshold, or `None` while the streak is at or
    /// below it.
    fn excess(&self, config: &BreakerConfig) -> Option<u32> {
        self.consecutive_failures
            .checked_sub(config.failure_threshold)
            .and_then(|over| over.checked_sub(1))
    }

    /// Deadline before which calls are rejected, if the gate is engaged.
    pub(crate) fn cooldown(&self, config: &BreakerConfig) -> Option<Cooldown> {
        let excess = self.excess(config)?;
        let deadline = cooldown_window(config.base_cooldown, config.max_cooldown, excess)
            .and_then(|window| self.last_attempt.checked_add(window));

        Some(match deadline {
            Some(deadline) => Cooldown::Until(deadline),
            None => Cooldown::Indefinite,
        })
    }

    /// Decides whether a call arriving at `now` may proceed. Never mutates.
    pub(crate) fn check(&self, config: &BreakerConfig, now: Instant) -> Admission {
        match self.cooldown(config) {
            None => Admission::Permitted,
            Some(Cooldown::Until(deadline)) if now > deadline => Admission::Permitted,
            Some(Cooldown::Until(deadline)) => Admission::Rejected {
                retry_after: Some(deadline.saturating_duration_since(now)),
            },
            Some(Cooldown::Indefinite) => Admission::Rejected { retry_after: None },
        }
    }

    /// Records the outcome of a completed call at `now`.
    pub(crate) fn record(&mut self, failed: bool, now: Instant) {
        self.last_attempt = now;
        if failed {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        } else {
            self.consecutive_failures = 0;
        }
    }
}

/// `base * 2^excess`, clamped to `max` when set.
///
/// Returns `None` when the unclamped window overflows `Duration`.
pub(crate) fn cooldown_window(
    base: Duration,
    max: Option<Duration>,
    excess: u32,
) -> Option<Duration> {
    let window = scale(base, excess);

    match (window, max) {
        (Some(window), Some(max)) => Some(window.min(max)),
        (None, Some(max)) => Some(max),
        (window, None) => window,
    }
}

fn scale(base: Duration, excess: u32) -> Option<Duration> {
    if base.is_zero() {
        return Some(Duration::ZERO);
    }

    let nanos = 1u128
        .checked_shl(excess)
        .and_then(|factor| factor.checked_mul(base.as_nanos()))?;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    // Remainder of a division by 1e9 always fits.
    Some(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}

const NANOS_PER_SEC: u128 = 1_000_000_000;
