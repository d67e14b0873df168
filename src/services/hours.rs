//! Weekly hours, blocked dates and per-date availability for a venue.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, Time};
use uuid::Uuid;

use crate::availability::{self, DayHours, Slot, TimeRange};
use crate::services::session::SessionUser;
use crate::services::venue::{self, VenueError};
use crate::timefmt::iso_date;
use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum HoursError {
    #[error("venue not found")]
    NotFound,
    #[error("not the owner of this venue")]
    Forbidden,
    #[error("invalid hours")]
    Invalid(FieldErrors),
    #[error("date already blocked")]
    AlreadyBlocked,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl From<VenueError> for HoursError {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::NotFound => Self::NotFound,
            VenueError::Db(e) => Self::Db(e),
            VenueError::Invalid(errors) => Self::Invalid(errors),
            VenueError::Forbidden | VenueError::TooManyImages => Self::Forbidden,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlockedDate {
    pub id: Uuid,
    pub venue_id: Uuid,
    #[serde(with = "iso_date")]
    pub blocked_date: Date,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlockedDate {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Slots for one venue on one date.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub venue_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub blocked: bool,
    pub slots: Vec<Slot>,
}

// =============================================================================
// WEEKLY HOURS
// =============================================================================

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_hours(pool: &PgPool, venue_id: Uuid) -> Result<Vec<DayHours>, sqlx::Error> {
    sqlx::query_as::<_, DayHours>(
        "SELECT weekday, open_time, close_time, is_closed FROM venue_hours WHERE venue_id = $1 ORDER BY weekday",
    )
    .bind(venue_id)
    .fetch_all(pool)
    .await
}

/// Replace the stored week inside an open transaction.
///
/// # Errors
///
/// Returns a database error if a statement fails.
pub async fn write_hours(
    tx: &mut Transaction<'_, Postgres>,
    venue_id: Uuid,
    hours: &[DayHours],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM venue_hours WHERE venue_id = $1")
        .bind(venue_id)
        .execute(&mut **tx)
        .await?;
    for day in hours {
        sqlx::query(
            "INSERT INTO venue_hours (venue_id, weekday, open_time, close_time, is_closed) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(venue_id)
        .bind(day.weekday)
        .bind(day.open_time)
        .bind(day.close_time)
        .bind(day.is_closed)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Validate and replace a venue's week.
///
/// # Errors
///
/// `Forbidden` unless `user` manages the venue; `Invalid` on a bad schedule.
pub async fn replace_hours(
    pool: &PgPool,
    user: &SessionUser,
    venue_id: Uuid,
    hours: &[DayHours],
) -> Result<Vec<DayHours>, HoursError> {
    venue::ensure_manager(pool, venue_id, user).await?;
    availability::validate_week(hours).into_result().map_err(HoursError::Invalid)?;

    let mut tx = pool.begin().await?;
    write_hours(&mut tx, venue_id, hours).await?;
    tx.commit().await?;

    Ok(get_hours(pool, venue_id).await?)
}

// =============================================================================
// BLOCKED DATES
// =============================================================================

/// Blocked dates from `from` onwards, ascending.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_blocked(pool: &PgPool, venue_id: Uuid, from: Date) -> Result<Vec<BlockedDate>, HoursError> {
    Ok(sqlx::query_as::<_, BlockedDate>(
        r"SELECT id, venue_id, blocked_date, reason FROM blocked_dates
          WHERE venue_id = $1 AND blocked_date >= $2
          ORDER BY blocked_date",
    )
    .bind(venue_id)
    .bind(from)
    .fetch_all(pool)
    .await?)
}

/// # Errors
///
/// `AlreadyBlocked` if the date is already blocked for this venue.
pub async fn add_blocked(
    pool: &PgPool,
    user: &SessionUser,
    venue_id: Uuid,
    new: &NewBlockedDate,
) -> Result<BlockedDate, HoursError> {
    venue::ensure_manager(pool, venue_id, user).await?;
    let reason = new.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());

    sqlx::query_as::<_, BlockedDate>(
        r"INSERT INTO blocked_dates (venue_id, blocked_date, reason) VALUES ($1, $2, $3)
          ON CONFLICT (venue_id, blocked_date) DO NOTHING
          RETURNING id, venue_id, blocked_date, reason",
    )
    .bind(venue_id)
    .bind(new.date)
    .bind(reason)
    .fetch_optional(pool)
    .await?
    .ok_or(HoursError::AlreadyBlocked)
}

/// # Errors
///
/// `NotFound` if the blocked date does not belong to the venue.
pub async fn remove_blocked(
    pool: &PgPool,
    user: &SessionUser,
    venue_id: Uuid,
    blocked_id: Uuid,
) -> Result<(), HoursError> {
    venue::ensure_manager(pool, venue_id, user).await?;
    let result = sqlx::query("DELETE FROM blocked_dates WHERE id = $1 AND venue_id = $2")
        .bind(blocked_id)
        .bind(venue_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(HoursError::NotFound);
    }
    Ok(())
}

// =============================================================================
// AVAILABILITY
// =============================================================================

#[derive(sqlx::FromRow)]
struct BookedRow {
    start_time: Time,
    end_time: Time,
}

/// Time ranges held by pending or confirmed bookings on `date`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn booked_ranges<'e, E>(executor: E, venue_id: Uuid, date: Date) -> Result<Vec<TimeRange>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, BookedRow>(
        r"SELECT start_time, end_time FROM bookings
          WHERE venue_id = $1 AND booking_date = $2 AND status IN ('pending', 'confirmed')",
    )
    .bind(venue_id)
    .bind(date)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(|r| TimeRange { start: r.start_time, end: r.end_time }).collect())
}

/// Whether the venue has `date` blocked.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn is_blocked<'e, E>(executor: E, venue_id: Uuid, date: Date) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blocked_dates WHERE venue_id = $1 AND blocked_date = $2)")
        .bind(venue_id)
        .bind(date)
        .fetch_one(executor)
        .await
}

/// Public slot listing for the booking page.
///
/// # Errors
///
/// `NotFound` for unknown or inactive venues.
pub async fn availability_for(pool: &PgPool, venue_id: Uuid, date: Date) -> Result<Availability, HoursError> {
    let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM venues WHERE id = $1")
        .bind(venue_id)
        .fetch_optional(pool)
        .await?;
    if active != Some(true) {
        return Err(HoursError::NotFound);
    }

    let hours = get_hours(pool, venue_id).await?;
    let blocked = is_blocked(pool, venue_id, date).await?;
    let booked = booked_ranges(pool, venue_id, date).await?;
    let blocked_dates = if blocked { vec![date] } else { Vec::new() };

    Ok(Availability {
        venue_id,
        date,
        blocked,
        slots: availability::slots_for_date(date, &hours, &blocked_dates, &booked),
    })
}
