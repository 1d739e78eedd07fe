//! Business-day computation.
//!
//! The clinic runs on a fixed-offset local timezone, not server time and not
//! UTC. Every place that needs "today" (the token allocator, day-filtered
//! queries, retention cleanup) goes through [`BusinessCalendar`] so token
//! numbering and queue visibility can never disagree near midnight.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Converts UTC instants to the clinic's business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    /// Build a calendar from a UTC offset in minutes (east positive).
    ///
    /// Returns `None` if the offset is out of range for a timezone.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        let offset = minutes.checked_mul(60).and_then(FixedOffset::east_opt)?;
        Some(Self { offset })
    }

    /// The business day a given UTC instant falls on.
    pub fn business_day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Today's business day.
    pub fn today(&self) -> NaiveDate {
        self.business_day_of(Utc::now())
    }

    /// Today's business day as the `day` key stored in the database.
    pub fn today_key(&self) -> String {
        Self::day_key(self.today())
    }

    /// Format a date as a `day` key (ISO `YYYY-MM-DD`).
    pub fn day_key(day: NaiveDate) -> String {
        day.format("%Y-%m-%d").to_string()
    }

    /// The configured UTC offset in minutes.
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kolkata() -> BusinessCalendar {
        BusinessCalendar::from_offset_minutes(330).unwrap()
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(BusinessCalendar::from_offset_minutes(24 * 60).is_none());
        assert!(BusinessCalendar::from_offset_minutes(i32::MAX).is_none());
        assert!(BusinessCalendar::from_offset_minutes(-330).is_some());
    }

    #[test]
    fn test_day_rolls_at_local_midnight() {
        let cal = kolkata();

        // 18:30 UTC is midnight at +05:30.
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 18, 29, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 18, 31, 0).unwrap();

        assert_eq!(
            cal.business_day_of(before),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
        assert_eq!(
            cal.business_day_of(after),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_utc_calendar_keeps_utc_date() {
        let cal = BusinessCalendar::from_offset_minutes(0).unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        assert_eq!(
            cal.business_day_of(instant),
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
    }

    #[test]
    fn test_day_key_format() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(BusinessCalendar::day_key(day), "2024-01-05");
    }
}
