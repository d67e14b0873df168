//! Booking routes: reserve, confirm payment, cancel, and the owner view.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::services::booking::{self, Booking, BookingError, BookingRequest};
use crate::state::AppState;

pub(crate) fn booking_error_to_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::NotFound | BookingError::VenueNotFound => StatusCode::NOT_FOUND,
        BookingError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::SlotUnavailable | BookingError::NotCancellable(_) => StatusCode::CONFLICT,
        BookingError::Forbidden => StatusCode::FORBIDDEN,
        BookingError::PaymentsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BookingError::Payment(e) => super::payment_error_to_status(e),
        BookingError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn booking_error_response(err: BookingError) -> Response {
    let status = booking_error_to_status(&err);
    match err {
        BookingError::Invalid(errors) => errors.into_response(),
        BookingError::Db(e) => {
            tracing::error!(error = %e, "booking query failed");
            status.into_response()
        }
        other => {
            if status.is_server_error() {
                tracing::error!(error = %other, "booking request failed");
            }
            (status, other.to_string()).into_response()
        }
    }
}

/// `GET /api/bookings` — the caller's bookings.
pub async fn list_mine(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Booking>>, Response> {
    booking::list_for_user(&state.pool, auth.user.id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// `GET /api/owner/bookings` — bookings across the caller's venues.
pub async fn list_for_owner(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Booking>>, Response> {
    if !auth.user.is_owner() {
        return Err(StatusCode::FORBIDDEN.into_response());
    }
    booking::list_for_owner(&state.pool, auth.user.id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// `GET /api/bookings/{id}`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(booking_id): Path<Uuid>) -> Result<Json<Booking>, Response> {
    booking::get(&state.pool, &auth.user, booking_id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(booking_error_response)
}

/// `POST /api/bookings` — reserve a slot as pending.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), Response> {
    let created = booking::create(&state.pool, &auth.user, &req, super::today(), &state.config.pricing)
        .await
        .map_err(booking_error_response)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentBody {
    pub session_id: String,
}

/// `POST /api/bookings/verify-payment` — confirm after checkout returns.
pub async fn verify_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<VerifyPaymentBody>,
) -> Result<Json<Booking>, Response> {
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST.into_response());
    }
    booking::verify_payment(
        &state.pool,
        state.payments.as_deref(),
        &auth.user,
        session_id,
        &state.config.pricing,
    )
    .await
    .map(Json)
    .map_err(booking_error_response)
}

/// `POST /api/bookings/{id}/cancel` — cancel pending, refund confirmed.
pub async fn cancel(State(state): State<AppState>, auth: AuthUser, Path(booking_id): Path<Uuid>) -> Result<Json<Booking>, Response> {
    booking::cancel(
        &state.pool,
        state.payments.as_deref(),
        &auth.user,
        booking_id,
        &state.config.pricing,
    )
    .await
    .map(Json)
    .map_err(booking_error_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookingStatus;
    use crate::payments::PaymentError;
    use crate::validation::FieldErrors;

    #[test]
    fn booking_errors_map_to_statuses() {
        assert_eq!(booking_error_to_status(&BookingError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(booking_error_to_status(&BookingError::VenueNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            booking_error_to_status(&BookingError::Invalid(FieldErrors::new())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(booking_error_to_status(&BookingError::SlotUnavailable), StatusCode::CONFLICT);
        assert_eq!(
            booking_error_to_status(&BookingError::NotCancellable(BookingStatus::Refunded)),
            StatusCode::CONFLICT
        );
        assert_eq!(booking_error_to_status(&BookingError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(booking_error_to_status(&BookingError::PaymentsUnavailable), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn failed_refund_is_a_gateway_error() {
        let err = BookingError::Payment(PaymentError::Status { function: "refund-booking", status: 500, body: String::new() });
        assert_eq!(booking_error_to_status(&err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unavailable_slot_response_is_conflict() {
        assert_eq!(booking_error_response(BookingError::SlotUnavailable).status(), StatusCode::CONFLICT);
    }
}
