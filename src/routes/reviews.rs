//! Venue review routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::services::review::{self, Review, ReviewError, ReviewInput};
use crate::state::AppState;

pub(crate) fn review_error_to_status(err: &ReviewError) -> StatusCode {
    match err {
        ReviewError::NotFound => StatusCode::NOT_FOUND,
        ReviewError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewError::NotEligible => StatusCode::FORBIDDEN,
        ReviewError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn review_error_response(err: ReviewError) -> Response {
    match err {
        ReviewError::Invalid(errors) => errors.into_response(),
        ReviewError::Db(e) => {
            tracing::error!(error = %e, "review query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        other => (review_error_to_status(&other), other.to_string()).into_response(),
    }
}

/// `GET /api/venues/{id}/reviews`
pub async fn list(State(state): State<AppState>, Path(venue_id): Path<Uuid>) -> Result<Json<Vec<Review>>, Response> {
    review::list_for_venue(&state.pool, venue_id)
        .await
        .map(Json)
        .map_err(review_error_response)
}

/// `PUT /api/venues/{id}/reviews` — create or replace the caller's review.
pub async fn upsert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    Json(input): Json<ReviewInput>,
) -> Result<Json<Review>, Response> {
    review::upsert(&state.pool, &auth.user, venue_id, &input)
        .await
        .map(Json)
        .map_err(review_error_response)
}

/// `DELETE /api/reviews/{id}`
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(review_id): Path<Uuid>) -> Result<StatusCode, Response> {
    review::delete(&state.pool, &auth.user, review_id)
        .await
        .map_err(review_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldErrors;

    #[test]
    fn review_errors_map_to_statuses() {
        assert_eq!(review_error_to_status(&ReviewError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(review_error_to_status(&ReviewError::Invalid(FieldErrors::new())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(review_error_to_status(&ReviewError::NotEligible), StatusCode::FORBIDDEN);
    }
}
