use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;

/// Source of "today" for history labels and of message-id timestamps.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn unix_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn unix_ms(&self) -> u64 {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Clock pinned to one instant.
pub struct FixedClock {
    pub today: NaiveDate,
    pub unix_ms: u64,
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn unix_ms(&self) -> u64 {
        self.unix_ms
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Clock, FixedClock, SystemClock};

    #[test]
    fn unit_fixed_clock_reports_pinned_values() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).expect("date");
        let clock = FixedClock {
            today,
            unix_ms: 42,
        };
        assert_eq!(clock.today(), today);
        assert_eq!(clock.unix_ms(), 42);
        assert!(SystemClock.unix_ms() > 0);
    }
}
