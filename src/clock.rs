//! Ambient capabilities injected into the stores: identifiers and time.

use chrono::{DateTime, Local, NaiveDate, SubsecRound, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The calendar date due dates are compared against.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    /// Truncated to milliseconds, the precision timestamps are stored with.
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Yields `00000000-0000-0000-0000-000000000001`, `...0002`, and so on.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n))
    }
}

/// A clock that only moves when told to. Each call to `now` advances it by
/// one second so that creation timestamps stay distinct and ordered.
#[derive(Debug)]
pub struct FixedClock {
    start: DateTime<Utc>,
    ticks: AtomicU64,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ticks: AtomicU64::new(0),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed);
        self.start + chrono::Duration::seconds(ticks as i64)
    }

    fn today(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sequential_ids_are_distinct_and_ordered() {
        let ids = SequentialIds::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first.to_string(), "00000000-0000-0000-0000-000000000001");
        assert!(first < second);
    }

    #[test]
    fn test_fixed_clock_ticks_forward() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert!(clock.now() > start);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_system_clock_has_millisecond_precision() {
        use chrono::Timelike;
        assert_eq!(SystemClock.now().nanosecond() % 1_000_000, 0);
    }
}
