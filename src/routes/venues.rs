//! Venue routes: browse, detail, owner management, hours and availability.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::availability::DayHours;
use crate::discovery::{self, VenueQuery};
use crate::services::hours::{self, Availability, BlockedDate, HoursError, NewBlockedDate};
use crate::services::venue::{self, VenueDetail, VenueError, VenueSummary};
use crate::state::AppState;
use crate::storage::Bucket;
use crate::timefmt;
use crate::wizard::VenueDraft;

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn venue_error_to_status(err: &VenueError) -> StatusCode {
    match err {
        VenueError::NotFound => StatusCode::NOT_FOUND,
        VenueError::Forbidden => StatusCode::FORBIDDEN,
        VenueError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VenueError::TooManyImages => StatusCode::CONFLICT,
        VenueError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn venue_error_response(err: VenueError) -> Response {
    match err {
        VenueError::Invalid(errors) => errors.into_response(),
        VenueError::Db(e) => {
            tracing::error!(error = %e, "venue query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        other => (venue_error_to_status(&other), other.to_string()).into_response(),
    }
}

pub(crate) fn hours_error_to_status(err: &HoursError) -> StatusCode {
    match err {
        HoursError::NotFound => StatusCode::NOT_FOUND,
        HoursError::Forbidden => StatusCode::FORBIDDEN,
        HoursError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HoursError::AlreadyBlocked => StatusCode::CONFLICT,
        HoursError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn hours_error_response(err: HoursError) -> Response {
    match err {
        HoursError::Invalid(errors) => errors.into_response(),
        HoursError::Db(e) => {
            tracing::error!(error = %e, "hours query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        other => (hours_error_to_status(&other), other.to_string()).into_response(),
    }
}

/// Optional `YYYY-MM-DD` query value; present but unparseable is a 400.
fn parse_date_param(raw: Option<&str>) -> Result<Option<Date>, StatusCode> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => timefmt::parse_date(raw).map(Some).ok_or(StatusCode::BAD_REQUEST),
    }
}

// =============================================================================
// PUBLIC
// =============================================================================

/// `GET /api/venues` — active venues filtered and sorted by the query string.
pub async fn list(State(state): State<AppState>, Query(query): Query<VenueQuery>) -> Result<Json<Vec<VenueSummary>>, Response> {
    let venues = venue::list_active(&state.pool, &state.config.pricing)
        .await
        .map_err(venue_error_response)?;
    Ok(Json(discovery::apply_venue_query(venues, &query)))
}

/// `GET /api/venues/{id}`
pub async fn get_detail(State(state): State<AppState>, Path(venue_id): Path<Uuid>) -> Result<Json<VenueDetail>, Response> {
    venue::get_detail(&state.pool, venue_id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(venue_error_response)
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// `GET /api/venues/{id}/availability?date=YYYY-MM-DD` — defaults to today.
pub async fn availability(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Availability>, Response> {
    let date = parse_date_param(query.date.as_deref())
        .map_err(IntoResponse::into_response)?
        .unwrap_or_else(super::today);
    hours::availability_for(&state.pool, venue_id, date)
        .await
        .map(Json)
        .map_err(hours_error_response)
}

/// `GET /api/venues/{id}/hours`
pub async fn get_hours(State(state): State<AppState>, Path(venue_id): Path<Uuid>) -> Result<Json<Vec<DayHours>>, Response> {
    hours::get_hours(&state.pool, venue_id)
        .await
        .map(Json)
        .map_err(|e| hours_error_response(HoursError::Db(e)))
}

// =============================================================================
// OWNER
// =============================================================================

/// `GET /api/owner/venues` — the caller's venues, inactive included.
pub async fn list_own(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<VenueSummary>>, Response> {
    if !auth.user.is_owner() {
        return Err(StatusCode::FORBIDDEN.into_response());
    }
    venue::list_for_owner(&state.pool, auth.user.id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(venue_error_response)
}

/// `POST /api/venues`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(draft): Json<VenueDraft>,
) -> Result<(StatusCode, Json<VenueSummary>), Response> {
    let created = venue::create(&state.pool, &auth.user, &draft, &state.config.pricing)
        .await
        .map_err(venue_error_response)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/venues/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    Json(draft): Json<VenueDraft>,
) -> Result<Json<VenueSummary>, Response> {
    venue::update(&state.pool, &auth.user, venue_id, &draft, &state.config.pricing)
        .await
        .map(Json)
        .map_err(venue_error_response)
}

/// `DELETE /api/venues/{id}` — soft delete.
pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    venue::deactivate(&state.pool, &auth.user, venue_id)
        .await
        .map_err(venue_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub url: String,
    pub image_urls: Vec<String>,
}

/// `POST /api/venues/{id}/images` — multipart image upload.
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImagesResponse>), Response> {
    venue::ensure_manager(&state.pool, venue_id, &auth.user)
        .await
        .map_err(venue_error_response)?;
    let url = super::store_image(&state, Bucket::VenueImages, auth.user.id, multipart)
        .await
        .map_err(IntoResponse::into_response)?;
    let image_urls = venue::add_image(&state.pool, &auth.user, venue_id, &url)
        .await
        .map_err(venue_error_response)?;
    Ok((StatusCode::CREATED, Json(ImagesResponse { url, image_urls })))
}

/// `PUT /api/venues/{id}/hours` — replace the whole week.
pub async fn replace_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    Json(week): Json<Vec<DayHours>>,
) -> Result<Json<Vec<DayHours>>, Response> {
    hours::replace_hours(&state.pool, &auth.user, venue_id, &week)
        .await
        .map(Json)
        .map_err(hours_error_response)
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockedQuery {
    pub from: Option<String>,
}

/// `GET /api/venues/{id}/blocked-dates?from=YYYY-MM-DD` — defaults to today.
pub async fn list_blocked(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    Query(query): Query<BlockedQuery>,
) -> Result<Json<Vec<BlockedDate>>, Response> {
    venue::ensure_manager(&state.pool, venue_id, &auth.user)
        .await
        .map_err(venue_error_response)?;
    let from = parse_date_param(query.from.as_deref())
        .map_err(IntoResponse::into_response)?
        .unwrap_or_else(super::today);
    hours::list_blocked(&state.pool, venue_id, from)
        .await
        .map(Json)
        .map_err(hours_error_response)
}

/// `POST /api/venues/{id}/blocked-dates`
pub async fn add_blocked(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(venue_id): Path<Uuid>,
    Json(body): Json<NewBlockedDate>,
) -> Result<(StatusCode, Json<BlockedDate>), Response> {
    let blocked = hours::add_blocked(&state.pool, &auth.user, venue_id, &body)
        .await
        .map_err(hours_error_response)?;
    Ok((StatusCode::CREATED, Json(blocked)))
}

/// `DELETE /api/venues/{id}/blocked-dates/{blocked_id}`
pub async fn remove_blocked(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((venue_id, blocked_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, Response> {
    hours::remove_blocked(&state.pool, &auth.user, venue_id, blocked_id)
        .await
        .map_err(hours_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "venues_test.rs"]
mod tests;
