//! Dates in the server's local timezone.

use std::ops::RangeInclusive;

use serde::Deserialize;
use time::{Date, Month, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the current UTC offset of `canonical_timezone`, e.g. "America/Sao_Paulo".
///
/// Returns `None` if the timezone name is not a valid canonical name.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`, e.g. "America/Sao_Paulo".
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not a valid canonical name.
pub fn local_today(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

/// A month to report on, read from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MonthQuery {
    /// The calendar year.
    pub year: i32,
    /// The month, 1 to 12.
    pub month: u8,
}

/// The first to the last day of `month` (1 to 12) in `year`.
///
/// # Errors
/// Returns [Error::InvalidMonth] if `month` is out of range.
pub fn month_range(year: i32, month: u8) -> Result<RangeInclusive<Date>, Error> {
    let calendar_month = Month::try_from(month).map_err(|_| Error::InvalidMonth(month))?;
    let first =
        Date::from_calendar_date(year, calendar_month, 1).map_err(|_| Error::InvalidMonth(month))?;
    let last = (28..=31)
        .rev()
        .find_map(|day| Date::from_calendar_date(year, calendar_month, day).ok())
        .ok_or(Error::InvalidMonth(month))?;

    Ok(first..=last)
}
