//! As-of-date handling: day clamping and the 3-year lookback window.

use chrono::{Datelike, NaiveDate};

/// Aggregation window over report dates: strictly after `start`, up to
/// and including `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.start && date <= self.end
    }
}

/// Builds a date from caller-supplied parts, clamping the day to the last
/// day of the month (31 -> 30 for short months, Feb -> 29 or 28).
///
/// Returns `None` for an invalid month or a day of zero.
pub fn clamp_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let mut day = day;
    while day > 28 {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
        day -= 1;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The 3-year lookback window ending at `as_of`, inclusive on the upper
/// bound and exclusive on the lower.
///
/// A Feb 29 as-of date lands on Feb 28 three years back.
pub fn lookback_window(as_of: NaiveDate) -> DateWindow {
    let start_year = as_of.year() - 3;
    let start = NaiveDate::from_ymd_opt(start_year, as_of.month(), as_of.day())
        .or_else(|| NaiveDate::from_ymd_opt(start_year, 2, 28))
        .unwrap_or(as_of);
    DateWindow { start, end: as_of }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_is_three_years() {
        let w = lookback_window(date(2021, 12, 31));
        assert_eq!(w.start, date(2018, 12, 31));
        assert_eq!(w.end, date(2021, 12, 31));
    }

    #[test]
    fn test_window_bounds_exclusive_inclusive() {
        let w = lookback_window(date(2021, 12, 31));
        assert!(!w.contains(date(2018, 12, 31)));
        assert!(w.contains(date(2019, 1, 1)));
        assert!(w.contains(date(2021, 12, 31)));
        assert!(!w.contains(date(2022, 1, 1)));
    }

    #[test]
    fn test_window_from_leap_day() {
        let w = lookback_window(date(2020, 2, 29));
        assert_eq!(w.start, date(2017, 2, 28));
    }

    #[test]
    fn test_clamp_day_short_month() {
        assert_eq!(clamp_day(2021, 4, 31), Some(date(2021, 4, 30)));
        assert_eq!(clamp_day(2021, 4, 30), Some(date(2021, 4, 30)));
    }

    #[test]
    fn test_clamp_day_february() {
        assert_eq!(clamp_day(2021, 2, 31), Some(date(2021, 2, 28)));
        assert_eq!(clamp_day(2020, 2, 31), Some(date(2020, 2, 29)));
    }

    #[test]
    fn test_clamp_day_invalid() {
        assert_eq!(clamp_day(2021, 13, 1), None);
        assert_eq!(clamp_day(2021, 6, 0), None);
    }
}
