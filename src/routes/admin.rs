//! Admin console routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::domain::Role;
use crate::services::admin::{self, AdminError, PlatformStats, UserListQuery, UserRow};
use crate::state::AppState;

pub(crate) fn admin_error_to_status(err: &AdminError) -> StatusCode {
    match err {
        AdminError::Forbidden => StatusCode::FORBIDDEN,
        AdminError::NotFound => StatusCode::NOT_FOUND,
        AdminError::SelfDemotion => StatusCode::BAD_REQUEST,
        AdminError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn admin_error_response(err: AdminError) -> Response {
    let status = admin_error_to_status(&err);
    if let AdminError::Db(e) = &err {
        tracing::error!(error = %e, "admin query failed");
        return status.into_response();
    }
    (status, err.to_string()).into_response()
}

/// `GET /api/admin/stats`
pub async fn stats(State(state): State<AppState>, auth: AuthUser) -> Result<Json<PlatformStats>, Response> {
    admin::require_admin(&auth.user).map_err(admin_error_response)?;
    admin::stats(&state.pool)
        .await
        .map(Json)
        .map_err(admin_error_response)
}

/// `GET /api/admin/users?role=&q=&limit=&offset=`
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserRow>>, Response> {
    admin::require_admin(&auth.user).map_err(admin_error_response)?;
    admin::list_users(&state.pool, &query)
        .await
        .map(Json)
        .map_err(admin_error_response)
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

/// `PUT /api/admin/users/{id}/role`
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> Result<StatusCode, Response> {
    admin::set_role(&state.pool, &auth.user, user_id, body.role)
        .await
        .map_err(admin_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
