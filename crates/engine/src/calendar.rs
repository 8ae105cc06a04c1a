//! Business-day arithmetic.
//!
//! A business day is any Monday–Friday. No holiday calendar is modeled.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Serialization format for every date the scheduler emits.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Move `n` business days forward (or backward when `n` is negative).
///
/// Only weekdays landed on are counted, so adding 1 to a Friday yields the
/// following Monday. `n == 0` returns `date` unchanged, even on a weekend.
/// Stops at the edge of the representable date range instead of overflowing.
pub fn add_business_days(date: NaiveDate, n: i64) -> NaiveDate {
    let mut remaining = n.unsigned_abs();
    let mut current = date;
    while remaining > 0 {
        let next = if n < 0 { current.pred_opt() } else { current.succ_opt() };
        let Some(next) = next else {
            break;
        };
        current = next;
        if is_business_day(current) {
            remaining -= 1;
        }
    }
    current
}

pub fn sub_business_days(date: NaiveDate, n: i64) -> NaiveDate {
    add_business_days(date, -n)
}

/// Signed number of business days from `b` to `a`.
///
/// Counts the business days in `(b, a]` (negated when `a < b`), which makes
/// `add_business_days(b, business_day_diff(a, b)) == a` for any business day `a`.
pub fn business_day_diff(a: NaiveDate, b: NaiveDate) -> i64 {
    let (from, to, sign) = if a >= b { (b, a, 1) } else { (a, b, -1) };
    let mut count = 0;
    let mut current = from;
    while current < to {
        let Some(next) = current.succ_opt() else {
            break;
        };
        current = next;
        if is_business_day(current) {
            count += 1;
        }
    }
    count * sign
}

/// Saturates at the edge of the representable date range.
pub fn add_calendar_days(date: NaiveDate, n: i64) -> NaiveDate {
    let days = Days::new(n.unsigned_abs());
    if n < 0 {
        date.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
    } else {
        date.checked_add_days(days).unwrap_or(NaiveDate::MAX)
    }
}

/// `date` itself when it is a business day, otherwise the next Monday.
pub fn roll_forward(date: NaiveDate) -> NaiveDate {
    let mut current = date;
    while !is_business_day(current) {
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// Last day of a span of `duration` business days starting on `start`.
///
/// Durations below 1 are treated as 1 so the span never inverts.
pub fn span_end(start: NaiveDate, duration: i64) -> NaiveDate {
    add_business_days(start, duration.max(1) - 1)
}

/// Every business day in `[start, end]`.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(|d| is_business_day(*d))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
