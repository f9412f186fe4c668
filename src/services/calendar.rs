//! Calendar arithmetic on plain dates.

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::models::frequency::DayOfWeek;

/// Months since year 0, so that month stepping is plain integer math.
pub fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// First day of the month with the given [`month_index`].
pub fn first_of_month(index: i64) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Last day of the month containing `first`.
pub fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    first
        .with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// `day` in the month, clamped to the month's last day.
pub fn clamped_day_of_month(first: NaiveDate, day: u32) -> Option<NaiveDate> {
    let last = last_day_of_month(first)?;
    first.with_day(day.min(last.day()))
}

/// The `ordinal`-th `weekday` of the month, or `None` when the month has
/// fewer than `ordinal` of them.
pub fn nth_weekday_of_month(first: NaiveDate, ordinal: u32, weekday: DayOfWeek) -> Option<NaiveDate> {
    if ordinal == 0 {
        return None;
    }
    let first_weekday = DayOfWeek::of(first).days_from_sunday();
    let offset = (weekday.days_from_sunday() + 7 - first_weekday) % 7;
    let day = (ordinal - 1).checked_mul(7)?.checked_add(1 + offset)?;
    let last = last_day_of_month(first)?;
    if day > last.day() {
        return None;
    }
    first.with_day(day)
}

/// Last day of the month `months` after the month containing `date`.
///
/// `end_of_month_after(2025-01-15, 1)` is 2025-02-28.
pub fn end_of_month_after(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let first = date.with_day(1)?.checked_add_months(Months::new(months))?;
    last_day_of_month(first)
}
