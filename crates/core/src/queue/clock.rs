//! Local calendar day used for queue numbering.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Maps instants to the configured local queue day.
#[derive(Debug, Clone, Copy)]
pub struct QueueClock {
    offset: FixedOffset,
}

impl QueueClock {
    /// Build from an offset in minutes east of UTC. Out-of-range offsets fall back to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }
}

impl Default for QueueClock {
    fn default() -> Self {
        Self::new(0)
    }
}
