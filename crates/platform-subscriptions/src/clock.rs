//! Time sources.
//!
//! The engine and the sweeper never call `Utc::now()` directly; they ask the
//! injected [`Clock`]. Production code uses [`SystemClock`], tests drive a
//! [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use platform_subscriptions::{Clock, ManualClock};
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::days(1));
/// assert_eq!(clock.now(), start + Duration::days(1));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    /// Move forward (or backward, for a negative delta).
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();

        let later = Utc.with_ymd_and_hms(2026, 6, 30, 18, 30, 0).unwrap();
        clock.set(later);
        assert_eq!(shared.now(), later);

        shared.advance(Duration::hours(-6));
        assert_eq!(clock.now(), later - Duration::hours(6));

        clock.set(start);
        assert_eq!(shared.now(), start);
    }

    #[test]
    fn test_system_clock_moves() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
