use std::time::Duration;

use chrono::{DateTime, Utc};

/// Fires on every multiple of `period` since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCadence {
    period_ms: i64,
}

impl IntervalCadence {
    /// # Panics
    /// Panics on a zero period or one that does not fit in `i64` milliseconds.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let period_ms = i64::try_from(period.as_millis())
            .unwrap_or_else(|_| panic!("cadence period too large: {period:?}"));
        assert!(period_ms > 0, "cadence period must be positive");
        Self { period_ms }
    }

    #[must_use]
    pub fn next_run_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now_ms = now.timestamp_millis();
        let remainder = now_ms.rem_euclid(self.period_ms);
        let sub_ms_nanos = now.timestamp_subsec_nanos() % 1_000_000;
        if remainder == 0 && sub_ms_nanos == 0 {
            return now;
        }

        // 表現できない時刻になる場合は実質「次回なし」として扱う
        (now_ms - remainder)
            .checked_add(self.period_ms)
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
