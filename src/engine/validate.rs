//! Date-range validation for leave requests.

use chrono::{Duration, NaiveDate};

use super::error::DateRangeError;

/// Limits applied to incoming leave requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeavePolicy {
    /// Longest allowed request, in inclusive days.
    pub max_span_days: u32,
    /// How far ahead of today a request may end.
    pub horizon_days: i64,
    /// Longest reason accepted after sanitization.
    pub reason_max_chars: usize,
    /// Raw reasons are cut to this length before the limit above is checked.
    pub reason_truncate_chars: usize,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            max_span_days: 30,
            horizon_days: 365,
            reason_max_chars: 500,
            reason_truncate_chars: 1000,
        }
    }
}

/// A date range that passed validation. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive number of calendar days covered.
    pub fn days(&self) -> u32 {
        inclusive_days(self.start, self.end) as u32
    }
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

impl LeavePolicy {
    /// Check a candidate range against `today`.
    ///
    /// Rules run in a fixed order and the first failure is returned:
    /// - both dates present
    /// - start not after end
    /// - start not before today
    /// - end within the horizon
    /// - inclusive span within `max_span_days`
    pub fn validate(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<DateRange, DateRangeError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(DateRangeError::MissingDate);
        };

        if start > end {
            return Err(DateRangeError::InvertedRange { start, end });
        }

        if start < today {
            return Err(DateRangeError::PastDate { start, today });
        }

        // an unrepresentable horizon means no practical limit
        if let Some(latest) = today.checked_add_signed(Duration::days(self.horizon_days)) {
            if end > latest {
                return Err(DateRangeError::TooFarFuture { end, latest });
            }
        }

        let days = inclusive_days(start, end);
        if days > self.max_span_days as i64 {
            return Err(DateRangeError::DurationTooLong {
                days,
                max: self.max_span_days,
            });
        }

        Ok(DateRange { start, end })
    }
}

/// [`LeavePolicy::validate`] with the default limits.
pub fn validate(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange, DateRangeError> {
    LeavePolicy::default().validate(start, end, today)
}
