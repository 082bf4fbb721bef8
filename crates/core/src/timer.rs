//! Periodic gates and one-shot deadlines.
//!
//! Both take time as an explicit `Duration` from a [`Clock`](crate::Clock)
//! rather than reading it themselves, so the coordinator stays deterministic
//! under a manual clock.

use std::time::Duration;

/// A rate limiter for recurring work such as progress logs.
///
/// [`poll`](Periodic::poll) returns `true` at most once per interval;
/// [`reset`](Periodic::reset) suppresses the next trigger for a full
/// interval from now.
#[derive(Debug, Clone)]
pub struct Periodic {
    interval: Duration,
    last: Option<Duration>,
}

impl Periodic {
    /// Create a gate with the given interval. The first poll triggers.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` when at least one interval has elapsed since the last
    /// trigger (or if the gate has never triggered), and re-arms the gate.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now < last + self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Re-arm the gate so the next trigger is a full interval away.
    pub fn reset(&mut self, now: Duration) {
        self.last = Some(now);
    }
}

/// A one-shot countdown.
///
/// A freshly constructed deadline never reports expiry; it must be armed
/// with [`restart`](Deadline::restart) first.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    due: Option<Duration>,
}

impl Deadline {
    /// Create an unarmed deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the deadline to expire `timeout` from `now`.
    pub fn restart(&mut self, now: Duration, timeout: Duration) {
        self.due = Some(now + timeout);
    }

    /// Disarm the deadline.
    pub fn clear(&mut self) {
        self.due = None;
    }

    /// Whether the armed deadline has passed. Unarmed deadlines never expire.
    pub fn has_expired(&self, now: Duration) -> bool {
        self.due.is_some_and(|due| now >= due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_periodic_first_poll_triggers() {
        let mut periodic = Periodic::new(SECOND);
        assert!(periodic.poll(Duration::ZERO));
        assert!(!periodic.poll(Duration::from_millis(999)));
        assert!(periodic.poll(SECOND));
    }

    #[test]
    fn test_periodic_reset_suppresses() {
        let mut periodic = Periodic::new(SECOND);
        periodic.reset(Duration::ZERO);
        assert!(!periodic.poll(Duration::from_millis(500)));
        assert!(periodic.poll(Duration::from_millis(1500)));
    }

    #[test]
    fn test_periodic_triggers_once_per_interval() {
        let mut periodic = Periodic::new(SECOND);
        let mut triggers = 0;
        for ms in (0..5000).step_by(100) {
            if periodic.poll(Duration::from_millis(ms)) {
                triggers += 1;
            }
        }
        assert_eq!(triggers, 5);
    }

    #[test]
    fn test_deadline_unarmed_never_expires() {
        let deadline = Deadline::new();
        assert!(!deadline.has_expired(Duration::from_secs(3600)));
    }

    #[test]
    fn test_deadline_expiry() {
        let mut deadline = Deadline::new();
        deadline.restart(Duration::ZERO, Duration::from_secs(30));
        assert!(!deadline.has_expired(Duration::from_secs(29)));
        assert!(deadline.has_expired(Duration::from_secs(30)));
        assert!(deadline.has_expired(Duration::from_secs(31)));
    }

    #[test]
    fn test_deadline_restart_moves_expiry() {
        let mut deadline = Deadline::new();
        deadline.restart(Duration::ZERO, SECOND);
        deadline.restart(Duration::from_secs(10), SECOND);
        assert!(!deadline.has_expired(Duration::from_secs(10)));
        assert!(deadline.has_expired(Duration::from_secs(11)));
    }

    #[test]
    fn test_deadline_clear_disarms() {
        let mut deadline = Deadline::new();
        deadline.restart(Duration::ZERO, SECOND);
        deadline.clear();
        assert!(!deadline.has_expired(Duration::from_secs(5)));
    }
}
