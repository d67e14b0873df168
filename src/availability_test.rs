use super::*;
use time::macros::date;

fn week(open: Time, close: Time) -> Vec<DayHours> {
    (0..7)
        .map(|weekday| DayHours { weekday, open_time: open, close_time: close, is_closed: false })
        .collect()
}

fn closed_on(mut hours: Vec<DayHours>, weekday: i16) -> Vec<DayHours> {
    for day in &mut hours {
        if day.weekday == weekday {
            day.is_closed = true;
        }
    }
    hours
}

// 2024-06-02 is a Sunday.
const SUNDAY: Date = date!(2024 - 06 - 02);
const MONDAY: Date = date!(2024 - 06 - 03);

#[test]
fn weekday_index_counts_from_sunday() {
    assert_eq!(weekday_index(SUNDAY), 0);
    assert_eq!(weekday_index(MONDAY), 1);
    assert_eq!(weekday_index(date!(2024 - 06 - 08)), 6);
}

#[test]
fn candidate_slots_cover_six_to_twenty_three() {
    let slots = candidate_slots();
    assert_eq!(slots.len(), 17);
    assert_eq!(slots[0].start, time!(06:00));
    assert_eq!(slots[16].end, time!(23:00));
}

#[test]
fn closed_weekday_yields_no_slots() {
    let hours = closed_on(week(time!(08:00), time!(22:00)), 1);
    assert!(slots_for_date(MONDAY, &hours, &[], &[]).is_empty());
    assert!(!slots_for_date(SUNDAY, &hours, &[], &[]).is_empty());
}

#[test]
fn closed_weekday_yields_no_slots_every_week() {
    let hours = closed_on(week(time!(08:00), time!(22:00)), 1);
    for offset in 0..8 {
        let date = MONDAY + time::Duration::weeks(offset);
        assert!(slots_for_date(date, &hours, &[], &[]).is_empty(), "{date} should be closed");
    }
}

#[test]
fn blocked_date_yields_no_slots_regardless_of_hours() {
    let hours = week(time!(06:00), time!(23:00));
    assert!(slots_for_date(SUNDAY, &hours, &[SUNDAY], &[]).is_empty());
    assert_eq!(slots_for_date(MONDAY, &hours, &[SUNDAY], &[]).len(), 17);
}

#[test]
fn missing_weekday_row_yields_no_slots() {
    let hours: Vec<_> = week(time!(08:00), time!(22:00))
        .into_iter()
        .filter(|d| d.weekday != 0)
        .collect();
    assert!(slots_for_date(SUNDAY, &hours, &[], &[]).is_empty());
}

#[test]
fn slots_are_clipped_to_open_window() {
    let hours = week(time!(09:30), time!(12:00));
    let slots = slots_for_date(MONDAY, &hours, &[], &[]);
    let starts: Vec<_> = slots.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(starts, vec![(time!(10:00), time!(11:00)), (time!(11:00), time!(12:00))]);
}

#[test]
fn booked_slots_are_marked_unavailable() {
    let hours = week(time!(08:00), time!(12:00));
    let booked = [TimeRange { start: time!(09:00), end: time!(11:00) }];
    let slots = slots_for_date(MONDAY, &hours, &[], &booked);
    let available: Vec<_> = slots.iter().map(|s| s.available).collect();
    assert_eq!(available, vec![true, false, false, true]);
}

#[test]
fn is_bookable_requires_every_hour_free() {
    let hours = week(time!(08:00), time!(12:00));
    let booked = [TimeRange { start: time!(10:00), end: time!(11:00) }];

    let early = TimeRange { start: time!(08:00), end: time!(10:00) };
    let across = TimeRange { start: time!(09:00), end: time!(11:00) };
    assert!(is_bookable(MONDAY, early, &hours, &[], &booked));
    assert!(!is_bookable(MONDAY, across, &hours, &[], &booked));
}

#[test]
fn is_bookable_rejects_odd_ranges() {
    let hours = week(time!(08:00), time!(22:00));
    let reversed = TimeRange { start: time!(11:00), end: time!(10:00) };
    let half_hour = TimeRange { start: time!(10:30), end: time!(11:30) };
    let outside = TimeRange { start: time!(21:00), end: time!(23:00) };
    assert!(!is_bookable(MONDAY, reversed, &hours, &[], &[]));
    assert!(!is_bookable(MONDAY, half_hour, &hours, &[], &[]));
    assert!(!is_bookable(MONDAY, outside, &hours, &[], &[]));
}

#[test]
fn duration_hours_counts_whole_hours() {
    assert_eq!(duration_hours(TimeRange { start: time!(08:00), end: time!(11:00) }), 3);
}

#[test]
fn default_week_is_open_every_day() {
    let hours = default_week();
    assert_eq!(hours.len(), 7);
    assert!(hours.iter().all(|d| !d.is_closed));
    assert!(validate_week(&hours).is_empty());
}

#[test]
fn validate_week_flags_bad_rows() {
    let hours = vec![
        DayHours { weekday: 0, open_time: time!(10:00), close_time: time!(09:00), is_closed: false },
        DayHours { weekday: 0, open_time: time!(08:00), close_time: time!(09:00), is_closed: false },
        DayHours { weekday: 9, open_time: time!(08:00), close_time: time!(09:00), is_closed: false },
        DayHours { weekday: 3, open_time: time!(10:00), close_time: time!(09:00), is_closed: true },
    ];
    let errors = validate_week(&hours);
    assert!(errors.get("hours[0]").is_some());
    assert_eq!(errors.get("hours[1]"), Some("Weekday listed twice"));
    assert!(errors.get("hours[2]").is_some());
    assert!(errors.get("hours[3]").is_none());
}

#[test]
fn day_hours_json_uses_clock_format() {
    let day: DayHours =
        serde_json::from_str(r#"{"weekday":2,"open_time":"07:00","close_time":"21:30"}"#).unwrap();
    assert_eq!(day.open_time, time!(07:00));
    assert_eq!(day.close_time, time!(21:30));
    assert!(!day.is_closed);

    let json = serde_json::to_value(day).unwrap();
    assert_eq!(json["open_time"], "07:00");
}
