use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of "now" for every TTL and window check.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Seconds from settings as a chrono duration, clamped to what chrono holds.
pub fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000))
}

/// `at + value` seconds, or `None` past the representable range.
pub fn checked_after(at: DateTime<Utc>, value: u64) -> Option<DateTime<Utc>> {
    at.checked_add_signed(secs(value))
}

/// `at + value` seconds, pinned to the last representable instant.
pub fn saturating_after(at: DateTime<Utc>, value: u64) -> DateTime<Utc> {
    checked_after(at, value).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
