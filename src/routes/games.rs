//! Pickup game routes: browse, host, join, leave, cancel.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::discovery::{self, GameQuery};
use crate::services::game::{self, GameDetail, GameError, GameSummary, NewGame};
use crate::state::AppState;

pub(crate) fn game_error_to_status(err: &GameError) -> StatusCode {
    match err {
        GameError::NotFound => StatusCode::NOT_FOUND,
        GameError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GameError::Forbidden => StatusCode::FORBIDDEN,
        GameError::Full
        | GameError::NotOpen
        | GameError::AlreadyPlayed
        | GameError::AlreadyJoined
        | GameError::NotJoined
        | GameError::PaymentSessionUsed => StatusCode::CONFLICT,
        GameError::HostCannotLeave => StatusCode::BAD_REQUEST,
        GameError::PaymentRequired | GameError::PaymentMismatch => StatusCode::PAYMENT_REQUIRED,
        GameError::PaymentsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        GameError::Payment(e) => super::payment_error_to_status(e),
        GameError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn game_error_response(err: GameError) -> Response {
    let status = game_error_to_status(&err);
    match err {
        GameError::Invalid(errors) => errors.into_response(),
        GameError::Db(e) => {
            tracing::error!(error = %e, "game query failed");
            status.into_response()
        }
        other => {
            if status.is_server_error() {
                tracing::error!(error = %other, "game request failed");
            }
            (status, other.to_string()).into_response()
        }
    }
}

/// `GET /api/games` — upcoming games filtered and sorted by the query string.
pub async fn list(State(state): State<AppState>, Query(query): Query<GameQuery>) -> Result<Json<Vec<GameSummary>>, Response> {
    let games = game::list_upcoming(&state.pool, super::today(), &state.config.pricing)
        .await
        .map_err(game_error_response)?;
    Ok(Json(discovery::apply_game_query(games, &query)))
}

/// `GET /api/games/mine` — hosted or joined.
pub async fn list_mine(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<GameSummary>>, Response> {
    game::list_for_user(&state.pool, auth.user.id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(game_error_response)
}

/// `GET /api/games/{id}`
pub async fn get_detail(State(state): State<AppState>, Path(game_id): Path<Uuid>) -> Result<Json<GameDetail>, Response> {
    game::get_detail(&state.pool, game_id, &state.config.pricing)
        .await
        .map(Json)
        .map_err(game_error_response)
}

/// `POST /api/games`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewGame>,
) -> Result<(StatusCode, Json<GameSummary>), Response> {
    let created = game::create(&state.pool, &auth.user, &body, super::today(), &state.config.pricing)
        .await
        .map_err(game_error_response)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Default, Deserialize)]
pub struct JoinBody {
    /// Checkout session id; required for paid games.
    pub session_id: Option<String>,
}

/// `POST /api/games/{id}/join` — body is optional for free games.
pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(game_id): Path<Uuid>,
    body: Option<Json<JoinBody>>,
) -> Result<Json<GameSummary>, Response> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    game::join(
        &state.pool,
        state.payments.as_deref(),
        &auth.user,
        game_id,
        body.session_id.as_deref(),
        super::today(),
        &state.config.pricing,
    )
    .await
    .map(Json)
    .map_err(game_error_response)
}

/// `POST /api/games/{id}/leave`
pub async fn leave(State(state): State<AppState>, auth: AuthUser, Path(game_id): Path<Uuid>) -> Result<StatusCode, Response> {
    game::leave(&state.pool, &auth.user, game_id)
        .await
        .map_err(game_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/games/{id}` — host or admin.
pub async fn cancel(State(state): State<AppState>, auth: AuthUser, Path(game_id): Path<Uuid>) -> Result<StatusCode, Response> {
    game::cancel(&state.pool, &auth.user, game_id)
        .await
        .map_err(game_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
