//! Profile routes: own profile, onboarding wizards, avatar, public profile.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::services::profile::{self, Profile, ProfileError, ProfileUpdate, PublicProfile};
use crate::state::AppState;
use crate::storage::Bucket;
use crate::wizard::{OwnerOnboarding, PlayerOnboarding};

pub(crate) fn profile_error_to_status(err: &ProfileError) -> StatusCode {
    match err {
        ProfileError::NotFound => StatusCode::NOT_FOUND,
        ProfileError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProfileError::WrongRole(_) => StatusCode::FORBIDDEN,
        ProfileError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn profile_error_response(err: ProfileError) -> Response {
    match err {
        ProfileError::Invalid(errors) => errors.into_response(),
        ProfileError::Db(e) => {
            tracing::error!(error = %e, "profile query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        other => profile_error_to_status(&other).into_response(),
    }
}

/// `GET /api/profile`
pub async fn get_own(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Profile>, Response> {
    profile::get_profile(&state.pool, auth.user.id)
        .await
        .map(Json)
        .map_err(profile_error_response)
}

/// `PATCH /api/profile`
pub async fn update_own(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>, Response> {
    profile::update_profile(&state.pool, auth.user.id, &update)
        .await
        .map(Json)
        .map_err(profile_error_response)
}

/// `POST /api/onboarding/player`
pub async fn onboard_player(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<PlayerOnboarding>,
) -> Result<Json<Profile>, Response> {
    profile::complete_player_onboarding(&state.pool, auth.user.id, auth.user.role, &form)
        .await
        .map(Json)
        .map_err(profile_error_response)
}

/// `POST /api/onboarding/owner`
pub async fn onboard_owner(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<OwnerOnboarding>,
) -> Result<Json<Profile>, Response> {
    profile::complete_owner_onboarding(&state.pool, auth.user.id, auth.user.role, &form)
        .await
        .map(Json)
        .map_err(profile_error_response)
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// `POST /api/profile/avatar` — multipart image upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<Json<AvatarResponse>, Response> {
    let url = super::store_image(&state, Bucket::Avatars, auth.user.id, multipart)
        .await
        .map_err(IntoResponse::into_response)?;
    profile::set_avatar_url(&state.pool, auth.user.id, &url)
        .await
        .map_err(profile_error_response)?;
    Ok(Json(AvatarResponse { avatar_url: url }))
}

/// `GET /api/users/{id}` — public profile, no contact details.
pub async fn get_public(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> Result<Json<PublicProfile>, Response> {
    profile::get_public_profile(&state.pool, user_id)
        .await
        .map(Json)
        .map_err(profile_error_response)
}
