//! Whole months between today and the planned purchase month.

use chrono::{Datelike, Local, Months, NaiveDate};

/// Months between today and the target month the calculator starts with.
pub const DEFAULT_HORIZON_MONTHS: u32 = 24;

/// Source of "today" for the outer surfaces. The engine itself only ever
/// receives a date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Splits `"YYYY-MM"` into year and 1-based month. Anything after a second
/// dash is ignored so full ISO dates resolve to their month.
pub fn parse_target_month(target: &str) -> Option<(i32, u32)> {
    let mut parts = target.trim().split('-');
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

/// Whole calendar months from the first of today's month to the first of the
/// target month. Missing, malformed and past targets all yield 0.
pub fn months_remaining(target: Option<&str>, today: NaiveDate) -> u32 {
    let Some((year, month)) = target.and_then(parse_target_month) else {
        return 0;
    };

    let months = (i64::from(year) - i64::from(today.year())) * 12
        + (i64::from(month) - i64::from(today.month()));
    if months <= 0 {
        tracing::trace!(
            target_year = year,
            target_month = month,
            months,
            "target month not in the future"
        );
        return 0;
    }
    u32::try_from(months).unwrap_or(u32::MAX)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `offset` months after `date`'s month. Saturates at
/// chrono's maximum date.
pub fn add_months(date: NaiveDate, offset: u32) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(offset))
        .unwrap_or(NaiveDate::MAX)
}

pub fn format_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// The `"YYYY-MM"` a fresh calculation targets: two years from this month.
pub fn default_target_month(today: NaiveDate) -> String {
    format_month(add_months(today, DEFAULT_HORIZON_MONTHS))
}
