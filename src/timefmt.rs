//! Wire formats for calendar dates and wall-clock times.
//!
//! Dates travel as `YYYY-MM-DD`, times of day as `HH:MM`. Timestamps use
//! `time::serde::rfc3339` directly.

time::serde::format_description!(pub clock, Time, "[hour]:[minute]");
time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

use time::macros::format_description;
use time::{Date, Time};

/// Parse a `YYYY-MM-DD` query parameter.
#[must_use]
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}
