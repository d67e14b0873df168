use super::*;
use crate::validation::FieldErrors;
use time::macros::date;

#[test]
fn venue_errors_map_to_statuses() {
    assert_eq!(venue_error_to_status(&VenueError::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(venue_error_to_status(&VenueError::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(venue_error_to_status(&VenueError::Invalid(FieldErrors::new())), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(venue_error_to_status(&VenueError::TooManyImages), StatusCode::CONFLICT);
}

#[test]
fn hours_errors_map_to_statuses() {
    assert_eq!(hours_error_to_status(&HoursError::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(hours_error_to_status(&HoursError::Forbidden), StatusCode::FORBIDDEN);
    assert_eq!(hours_error_to_status(&HoursError::AlreadyBlocked), StatusCode::CONFLICT);
    assert_eq!(hours_error_to_status(&HoursError::Invalid(FieldErrors::new())), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn invalid_draft_renders_unprocessable() {
    let mut errors = FieldErrors::new();
    errors.add("name", "Venue name is required");
    assert_eq!(venue_error_response(VenueError::Invalid(errors)).status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn date_param_parsing() {
    assert_eq!(parse_date_param(None), Ok(None));
    assert_eq!(parse_date_param(Some("  ")), Ok(None));
    assert_eq!(parse_date_param(Some("2026-03-14")), Ok(Some(date!(2026 - 03 - 14))));
    assert_eq!(parse_date_param(Some("14/03/2026")), Err(StatusCode::BAD_REQUEST));
}
