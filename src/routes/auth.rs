//! Auth routes: signup, password login, MFA code, session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::services::auth::{self as auth_svc, AuthError, LoginOutcome};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;
use crate::wizard::SignupForm;

const COOKIE_NAME: &str = "session_token";
const SESSION_DAYS: i64 = 30;

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// `COOKIE_SECURE` wins; otherwise secure whenever the public URL is HTTPS.
pub(crate) fn cookie_secure(public_base_url: &str) -> bool {
    env_bool("COOKIE_SECURE").unwrap_or_else(|| public_base_url.starts_with("https://"))
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::days(SESSION_DAYS))
        .build()
}

fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

/// Like [`AuthUser`], but anonymous requests get `None` instead of a 401.
pub struct MaybeAuthUser(pub Option<SessionUser>);

impl<S> axum::extract::FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(auth) => Ok(Self(Some(auth.user))),
            Err(StatusCode::UNAUTHORIZED) => Ok(Self(None)),
            Err(status) => Err(status),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials | AuthError::VerificationFailed => StatusCode::UNAUTHORIZED,
        AuthError::InvalidCode => StatusCode::BAD_REQUEST,
        AuthError::EmailDelivery(_) => StatusCode::BAD_GATEWAY,
        AuthError::MalformedHash | AuthError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_error_response(err: AuthError) -> Response {
    let status = auth_error_to_status(&err);
    match err {
        AuthError::Invalid(errors) => errors.into_response(),
        other => {
            if status.is_server_error() {
                tracing::error!(error = %other, "auth request failed");
            }
            (status, other.to_string()).into_response()
        }
    }
}

fn db_error_response(err: &sqlx::Error) -> Response {
    tracing::error!(error = %err, "auth database error");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> Result<(CookieJar, SessionUser), Response> {
    let token = session::create_session(&state.pool, user_id)
        .await
        .map_err(|e| db_error_response(&e))?;
    let user = session::validate_session(&state.pool, &token)
        .await
        .map_err(|e| db_error_response(&e))?
        .ok_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())?;
    let jar = jar.add(session_cookie(token, cookie_secure(&state.config.public_base_url)));
    Ok((jar, user))
}

/// `POST /api/auth/signup` — create an account and sign in.
pub async fn signup(State(state): State<AppState>, jar: CookieJar, Json(form): Json<SignupForm>) -> Response {
    let user_id = match auth_svc::signup(&state.pool, &form).await {
        Ok(id) => id,
        Err(e) => return auth_error_response(e),
    };
    match start_session(&state, jar, user_id).await {
        Ok((jar, user)) => (StatusCode::CREATED, jar, Json(user)).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// Login step reported to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum LoginResponse {
    Authenticated { user: SessionUser },
    MfaRequired { challenge_id: Uuid },
}

/// `POST /api/auth/login` — check credentials; may require a second factor.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginBody>) -> Response {
    let outcome = match auth_svc::login(&state.pool, &body.email, &body.password).await {
        Ok(outcome) => outcome,
        Err(e) => return auth_error_response(e),
    };

    match outcome {
        LoginOutcome::Authenticated { user_id } => match start_session(&state, jar, user_id).await {
            Ok((jar, user)) => (jar, Json(LoginResponse::Authenticated { user })).into_response(),
            Err(resp) => resp,
        },
        LoginOutcome::MfaRequired { challenge_id, code, email, name } => {
            if let Err(e) = auth_svc::deliver_code(state.config.mail.as_ref(), &email, &name, &code).await {
                return auth_error_response(e);
            }
            Json(LoginResponse::MfaRequired { challenge_id }).into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct MfaBody {
    pub challenge_id: Uuid,
    pub code: String,
}

/// `POST /api/auth/mfa/verify` — finish a login with the emailed code.
pub async fn verify_mfa(State(state): State<AppState>, jar: CookieJar, Json(body): Json<MfaBody>) -> Response {
    let user_id = match auth_svc::verify_mfa(&state.pool, body.challenge_id, &body.code).await {
        Ok(id) => id,
        Err(e) => return auth_error_response(e),
    };
    match start_session(&state, jar, user_id).await {
        Ok((jar, user)) => (jar, Json(LoginResponse::Authenticated { user })).into_response(),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
pub struct MfaSettingBody {
    pub enabled: bool,
}

/// `PUT /api/auth/mfa` — turn the emailed second factor on or off.
pub async fn set_mfa(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MfaSettingBody>,
) -> Result<StatusCode, Response> {
    auth_svc::set_mfa_enabled(&state.pool, auth.user.id, body.enabled)
        .await
        .map_err(auth_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }
    let jar = CookieJar::new().add(expired_session_cookie(cookie_secure(&state.config.public_base_url)));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
