//! Bookable slot computation.
//!
//! DESIGN
//! ======
//! A venue has one [`DayHours`] row per weekday plus a list of blocked dates.
//! For a given date the weekday row decides the open window; a blocked date
//! or a closed weekday yields no slots at all. Inside the window, fixed
//! one-hour candidate slots are offered, and slots overlapping an existing
//! non-cancelled booking are reported as unavailable rather than dropped so
//! clients can render them greyed out.

use serde::{Deserialize, Serialize};
use time::macros::time;
use time::{Date, Time};

use crate::timefmt::clock;
use crate::validation::FieldErrors;

/// First candidate slot start hour.
pub const FIRST_SLOT_HOUR: u8 = 6;
/// Last candidate slot start hour.
pub const LAST_SLOT_HOUR: u8 = 22;

/// Weekly operating hours for a single weekday (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DayHours {
    pub weekday: i16,
    #[serde(with = "clock")]
    pub open_time: Time,
    #[serde(with = "clock")]
    pub close_time: Time,
    #[serde(default)]
    pub is_closed: bool,
}

/// A booked time span on a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Time,
    pub end: Time,
}

impl TimeRange {
    #[must_use]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    #[serde(with = "clock")]
    pub start: Time,
    #[serde(with = "clock")]
    pub end: Time,
    pub available: bool,
}

/// Weekday index as stored in `venue_hours.weekday`.
#[must_use]
pub fn weekday_index(date: Date) -> i16 {
    i16::from(date.weekday().number_days_from_sunday())
}

/// All one-hour candidate slots, in order.
#[must_use]
pub fn candidate_slots() -> Vec<TimeRange> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .filter_map(|h| {
            let start = Time::from_hms(h, 0, 0).ok()?;
            let end = Time::from_hms(h + 1, 0, 0).ok()?;
            Some(TimeRange { start, end })
        })
        .collect()
}

/// The configured hours for the date's weekday, if any.
#[must_use]
pub fn hours_for(date: Date, hours: &[DayHours]) -> Option<&DayHours> {
    let weekday = weekday_index(date);
    hours.iter().find(|h| h.weekday == weekday)
}

/// Slots offered on `date`. Empty when the weekday is closed or unconfigured,
/// or when the date is blocked.
#[must_use]
pub fn slots_for_date(date: Date, hours: &[DayHours], blocked: &[Date], booked: &[TimeRange]) -> Vec<Slot> {
    if blocked.contains(&date) {
        return Vec::new();
    }
    let Some(day) = hours_for(date, hours) else {
        return Vec::new();
    };
    if day.is_closed {
        return Vec::new();
    }

    candidate_slots()
        .into_iter()
        .filter(|c| c.start >= day.open_time && c.end <= day.close_time)
        .map(|c| Slot { start: c.start, end: c.end, available: !booked.iter().any(|b| b.overlaps(&c)) })
        .collect()
}

/// Whether every hour of `range` is an available slot on `date`.
#[must_use]
pub fn is_bookable(date: Date, range: TimeRange, hours: &[DayHours], blocked: &[Date], booked: &[TimeRange]) -> bool {
    if range.start >= range.end || range.start.minute() != 0 || range.end.minute() != 0 {
        return false;
    }
    let slots = slots_for_date(date, hours, blocked, booked);
    (range.start.hour()..range.end.hour()).all(|h| slots.iter().any(|s| s.start.hour() == h && s.available))
}

/// Whole hours covered by the range.
#[must_use]
pub fn duration_hours(range: TimeRange) -> i64 {
    (range.end - range.start).whole_hours()
}

/// Hours used when an owner lists a venue without configuring a week.
#[must_use]
pub fn default_week() -> Vec<DayHours> {
    (0..7)
        .map(|weekday| DayHours { weekday, open_time: time!(08:00), close_time: time!(22:00), is_closed: false })
        .collect()
}

/// Validate a full weekly schedule before it replaces the stored one.
#[must_use]
pub fn validate_week(hours: &[DayHours]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (i, day) in hours.iter().enumerate() {
        let field = format!("hours[{i}]");
        if !(0..7).contains(&day.weekday) {
            errors.add(&field, "Weekday must be between 0 (Sunday) and 6 (Saturday)");
            continue;
        }
        if hours[..i].iter().any(|d| d.weekday == day.weekday) {
            errors.add(&field, "Weekday listed twice");
        }
        if !day.is_closed && day.open_time >= day.close_time {
            errors.add(&field, "Opening time must be before closing time");
        }
    }
    errors
}

#[cfg(test)]
#[path = "availability_test.rs"]
mod tests;
