//! Calendar arithmetic for monthly series.
//!
//! All series in this crate live on a first-of-month grid; these helpers keep
//! the month walking and label parsing in one place.

use chrono::{Datelike, Months, NaiveDate};

/// Date formats accepted for month labels, tried in order. The source tables
/// use day-first labels; ISO is accepted as a fallback.
const MONTH_LABEL_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d/%m/%y", "%Y-%m-%d"];

/// Snap a date to the first day of its month.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Linear month index (year * 12 + month), used for month differences.
pub fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month() as i64
}

/// Number of calendar months from `from` to `to` (negative when `to` is
/// earlier).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    month_index(to) - month_index(from)
}

/// Add `n` months to a date, saturating at the chrono range limit.
pub fn add_months(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_add_months(Months::new(n)).unwrap_or(date)
}

/// First-of-month dates for `periods` consecutive months starting at `start`.
pub fn month_sequence(start: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    let first = start_of_month(start);
    (0..periods as u32).map(|step| add_months(first, step)).collect()
}

/// Parse a month label into a first-of-month date.
///
/// Tries day-first formats before ISO, mirroring how the source spreadsheets
/// label their columns. Returns `None` for labels no format accepts.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let trimmed = label.trim();
    MONTH_LABEL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(start_of_month)
}
