//! Venue bookings: reserve, confirm after payment, cancel or refund.
//!
//! DESIGN
//! ======
//! A booking starts `pending` with its customer-price total fixed at creation.
//! Creation locks the venue row and re-reads hours, blocked dates and live
//! bookings inside the transaction, so two customers cannot reserve
//! overlapping hours. Checkout happens outside this service; once the
//! customer returns with a checkout session id, `verify-booking-payment`
//! names the booking to confirm. Cancelling a confirmed booking goes through
//! `refund-booking` and ends `refunded`; a pending one is simply `cancelled`.
//! Cancellation holds the booking row lock across the refund call, so a
//! booking is refunded at most once and a failed refund rolls back to
//! `confirmed`.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::availability::{self, TimeRange};
use crate::config::PricingConfig;
use crate::domain::BookingStatus;
use crate::payments::{PaymentError, PaymentFunctions};
use crate::pricing;
use crate::services::hours;
use crate::services::session::SessionUser;
use crate::timefmt::{clock, iso_date};
use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking not found")]
    NotFound,
    #[error("venue not found")]
    VenueNotFound,
    #[error("invalid booking")]
    Invalid(FieldErrors),
    #[error("slot is not available")]
    SlotUnavailable,
    #[error("not your booking")]
    Forbidden,
    #[error("booking is already {0:?}")]
    NotCancellable(BookingStatus),
    #[error("payments are not configured")]
    PaymentsUnavailable,
    #[error("payment function failed: {0}")]
    Payment(#[from] PaymentError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub venue_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "clock")]
    pub start_time: Time,
    #[serde(with = "clock")]
    pub end_time: Time,
}

impl BookingRequest {
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange { start: self.start_time, end: self.end_time }
    }

    /// Shape checks that need no database.
    #[must_use]
    pub fn validate(&self, today: Date) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.date < today {
            errors.add("date", "Date cannot be in the past");
        }
        if self.start_time >= self.end_time {
            errors.add("end_time", "End time must be after start time");
        } else if self.start_time.minute() != 0 || self.end_time.minute() != 0 {
            errors.add("start_time", "Bookings start and end on the hour");
        }
        errors
    }
}

/// Booking row with the names the dashboards show next to it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub venue_name: String,
    pub user_id: Uuid,
    pub customer_name: String,
    #[serde(with = "iso_date")]
    pub booking_date: Date,
    #[serde(with = "clock")]
    pub start_time: Time,
    #[serde(with = "clock")]
    pub end_time: Time,
    pub total_price: i64,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[sqlx(skip)]
    pub total_label: String,
}

impl Booking {
    #[must_use]
    pub fn priced(mut self, pricing: &PricingConfig) -> Self {
        self.total_label = pricing::format_price(self.total_price, &pricing.currency_symbol);
        self
    }
}

/// What cancelling a booking in `status` has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAction {
    Cancel,
    Refund,
}

/// # Errors
///
/// `NotCancellable` for bookings already cancelled or refunded.
pub fn cancel_action(status: BookingStatus) -> Result<CancelAction, BookingError> {
    match status {
        BookingStatus::Pending => Ok(CancelAction::Cancel),
        BookingStatus::Confirmed => Ok(CancelAction::Refund),
        other => Err(BookingError::NotCancellable(other)),
    }
}

const BOOKING_SELECT: &str = r"
    SELECT b.id, b.venue_id, v.name AS venue_name, b.user_id, p.full_name AS customer_name,
           b.booking_date, b.start_time, b.end_time, b.total_price, b.status, b.created_at
    FROM bookings b
    JOIN venues v ON v.id = b.venue_id
    JOIN profiles p ON p.id = b.user_id";

async fn fetch(pool: &PgPool, booking_id: Uuid) -> Result<Booking, BookingError> {
    sqlx::query_as::<_, Booking>(&format!("{BOOKING_SELECT} WHERE b.id = $1"))
        .bind(booking_id)
        .fetch_optional(pool)
        .await?
        .ok_or(BookingError::NotFound)
}

// =============================================================================
// READS
// =============================================================================

/// The customer's bookings, most recent date first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid, pricing: &PricingConfig) -> Result<Vec<Booking>, BookingError> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        "{BOOKING_SELECT} WHERE b.user_id = $1 ORDER BY b.booking_date DESC, b.start_time DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|b| b.priced(pricing)).collect())
}

/// Bookings across every venue of an owner.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_owner(pool: &PgPool, owner_id: Uuid, pricing: &PricingConfig) -> Result<Vec<Booking>, BookingError> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        "{BOOKING_SELECT} WHERE v.owner_id = $1 ORDER BY b.booking_date DESC, b.start_time DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|b| b.priced(pricing)).collect())
}

/// # Errors
///
/// `Forbidden` unless `user` made the booking, owns the venue, or is an admin.
pub async fn get(pool: &PgPool, user: &SessionUser, booking_id: Uuid, pricing: &PricingConfig) -> Result<Booking, BookingError> {
    let booking = fetch(pool, booking_id).await?;
    if booking.user_id != user.id && !user.is_admin() {
        let owner = crate::services::venue::owner_of(pool, booking.venue_id).await?;
        if owner != Some(user.id) {
            return Err(BookingError::Forbidden);
        }
    }
    Ok(booking.priced(pricing))
}

// =============================================================================
// WRITES
// =============================================================================

#[derive(sqlx::FromRow)]
struct LockedVenue {
    price_per_hour: i64,
    is_active: bool,
}

/// Reserve a slot as `pending`.
///
/// # Errors
///
/// `Invalid` for malformed requests; `SlotUnavailable` when any hour is
/// closed, blocked or already booked.
pub async fn create(
    pool: &PgPool,
    user: &SessionUser,
    req: &BookingRequest,
    today: Date,
    pricing: &PricingConfig,
) -> Result<Booking, BookingError> {
    req.validate(today).into_result().map_err(BookingError::Invalid)?;

    let mut tx = pool.begin().await?;
    let venue = sqlx::query_as::<_, LockedVenue>("SELECT price_per_hour, is_active FROM venues WHERE id = $1 FOR UPDATE")
        .bind(req.venue_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|v| v.is_active)
        .ok_or(BookingError::VenueNotFound)?;

    let week = sqlx::query_as::<_, availability::DayHours>(
        "SELECT weekday, open_time, close_time, is_closed FROM venue_hours WHERE venue_id = $1",
    )
    .bind(req.venue_id)
    .fetch_all(&mut *tx)
    .await?;
    let blocked = if hours::is_blocked(&mut *tx, req.venue_id, req.date).await? { vec![req.date] } else { Vec::new() };
    let booked = hours::booked_ranges(&mut *tx, req.venue_id, req.date).await?;

    if !availability::is_bookable(req.date, req.range(), &week, &blocked, &booked) {
        return Err(BookingError::SlotUnavailable);
    }

    let total = pricing::booking_total(
        venue.price_per_hour,
        availability::duration_hours(req.range()),
        pricing.service_fee_percent,
    );
    let booking_id: Uuid = sqlx::query_scalar(
        r"INSERT INTO bookings (venue_id, user_id, booking_date, start_time, end_time, total_price)
          VALUES ($1, $2, $3, $4, $5, $6)
          RETURNING id",
    )
    .bind(req.venue_id)
    .bind(user.id)
    .bind(req.date)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%booking_id, venue_id = %req.venue_id, user_id = %user.id, total, "booking created");
    Ok(fetch(pool, booking_id).await?.priced(pricing))
}

/// Confirm the booking named by a completed checkout session.
///
/// # Errors
///
/// `Payment` if verification fails; `NotFound` if the verified booking is
/// not one of the user's live bookings.
pub async fn verify_payment(
    pool: &PgPool,
    payments: Option<&dyn PaymentFunctions>,
    user: &SessionUser,
    session_id: &str,
    pricing: &PricingConfig,
) -> Result<Booking, BookingError> {
    let payments = payments.ok_or(BookingError::PaymentsUnavailable)?;
    let verified = payments.verify_booking_payment(session_id).await?;
    let booking_id = verified.booking.id;

    let updated = sqlx::query(
        r"UPDATE bookings SET status = 'confirmed', payment_session_id = $3
          WHERE id = $1 AND user_id = $2 AND status IN ('pending', 'confirmed')",
    )
    .bind(booking_id)
    .bind(user.id)
    .bind(session_id)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        tracing::warn!(%booking_id, user_id = %user.id, "verified payment for unknown or closed booking");
        return Err(BookingError::NotFound);
    }

    tracing::info!(%booking_id, "booking confirmed");
    Ok(fetch(pool, booking_id).await?.priced(pricing))
}

/// Cancel a pending booking, or refund a confirmed one.
///
/// # Errors
///
/// `Forbidden` unless the user made the booking or is an admin;
/// `NotCancellable` if it is already closed; `Payment` if the refund fails,
/// in which case the booking stays confirmed.
pub async fn cancel(
    pool: &PgPool,
    payments: Option<&dyn PaymentFunctions>,
    user: &SessionUser,
    booking_id: Uuid,
    pricing: &PricingConfig,
) -> Result<Booking, BookingError> {
    let mut tx = pool.begin().await?;
    let (owner_id, status): (Uuid, BookingStatus) =
        sqlx::query_as("SELECT user_id, status FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(BookingError::NotFound)?;
    if owner_id != user.id && !user.is_admin() {
        return Err(BookingError::Forbidden);
    }

    let next = match cancel_action(status)? {
        CancelAction::Cancel => BookingStatus::Cancelled,
        CancelAction::Refund => {
            let payments = payments.ok_or(BookingError::PaymentsUnavailable)?;
            payments.refund_booking(booking_id).await?;
            BookingStatus::Refunded
        }
    };

    sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
        .bind(booking_id)
        .bind(next)
        .execute(&mut *tx)
        .await?;
    if let Err(e) = tx.commit().await {
        if next == BookingStatus::Refunded {
            tracing::error!(%booking_id, error = %e, "refund issued but status update failed");
        }
        return Err(e.into());
    }

    tracing::info!(%booking_id, status = ?next, "booking closed");
    Ok(fetch(pool, booking_id).await?.priced(pricing))
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;
