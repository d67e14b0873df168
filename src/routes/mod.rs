//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the JSON API under `/api`, uploaded files under
//! `/storage`, and `/healthz`. Browser page guards are answered by
//! `/api/pages/resolve` so the frontend and the server agree on who may see
//! which screen.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod games;
pub mod profiles;
pub mod reviews;
pub mod venues;
pub mod wizards;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::pages::{self, Resolution, Viewer};
use crate::payments::PaymentError;
use crate::state::AppState;
use crate::storage::{self, Bucket, MAX_UPLOAD_BYTES, StorageError};

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let storage_dir = state.config.storage_dir.clone();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/pages/resolve", get(resolve_page))
        // auth
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/mfa/verify", post(auth::verify_mfa))
        .route("/api/auth/mfa", put(auth::set_mfa))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/wizards/{kind}/advance", post(wizards::advance))
        .route("/api/wizards/{kind}/back", post(wizards::back))
        .route("/api/wizards/{kind}/submit", post(wizards::submit))
        // profiles
        .route("/api/profile", get(profiles::get_own).patch(profiles::update_own))
        .route("/api/profile/avatar", post(profiles::upload_avatar))
        .route("/api/onboarding/player", post(profiles::onboard_player))
        .route("/api/onboarding/owner", post(profiles::onboard_owner))
        .route("/api/users/{id}", get(profiles::get_public))
        // venues
        .route("/api/venues", get(venues::list).post(venues::create))
        .route(
            "/api/venues/{id}",
            get(venues::get_detail).put(venues::update).delete(venues::deactivate),
        )
        .route("/api/venues/{id}/images", post(venues::upload_image))
        .route("/api/venues/{id}/hours", get(venues::get_hours).put(venues::replace_hours))
        .route(
            "/api/venues/{id}/blocked-dates",
            get(venues::list_blocked).post(venues::add_blocked),
        )
        .route("/api/venues/{id}/blocked-dates/{blocked_id}", delete(venues::remove_blocked))
        .route("/api/venues/{id}/availability", get(venues::availability))
        .route("/api/venues/{id}/reviews", get(reviews::list).put(reviews::upsert))
        .route("/api/reviews/{id}", delete(reviews::delete))
        .route("/api/owner/venues", get(venues::list_own))
        .route("/api/owner/bookings", get(bookings::list_for_owner))
        // games
        .route("/api/games", get(games::list).post(games::create))
        .route("/api/games/mine", get(games::list_mine))
        .route("/api/games/{id}", get(games::get_detail).delete(games::cancel))
        .route("/api/games/{id}/join", post(games::join))
        .route("/api/games/{id}/leave", post(games::leave))
        // bookings
        .route("/api/bookings", get(bookings::list_mine).post(bookings::create))
        .route("/api/bookings/verify-payment", post(bookings::verify_payment))
        .route("/api/bookings/{id}", get(bookings::get))
        .route("/api/bookings/{id}/cancel", post(bookings::cancel))
        // admin
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/role", put(admin::set_role))
        .nest_service("/storage", ServeDir::new(storage_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> StatusCode {
    match crate::db::ping(&state.pool).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[derive(Deserialize)]
struct ResolveQuery {
    path: String,
}

/// `GET /api/pages/resolve?path=` — what the browser should show at `path`.
async fn resolve_page(viewer: auth::MaybeAuthUser, Query(query): Query<ResolveQuery>) -> Json<Resolution> {
    let viewer = viewer.0.as_ref().map(Viewer::from);
    Json(pages::resolve(&query.path, viewer))
}

/// Calendar date used for "not in the past" checks.
pub(crate) fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Verification rejections are the caller's problem; anything else is the
/// payment backend's.
pub(crate) fn payment_error_to_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::Rejected => StatusCode::PAYMENT_REQUIRED,
        PaymentError::Http(_) | PaymentError::Status { .. } | PaymentError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// UPLOADS
// =============================================================================

pub(crate) fn storage_error_to_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StorageError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        StorageError::Empty | StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Store the first file field of a multipart body in `bucket` under the
/// user's prefix, returning its public URL.
pub(crate) async fn store_image(
    state: &AppState,
    bucket: Bucket,
    owner: Uuid,
    mut multipart: Multipart,
) -> Result<String, StatusCode> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.status())? {
        if field.file_name().is_none() {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|e| e.status())?;

        let stored = match storage::image_extension(&content_type, bytes.len()) {
            Ok(ext) => state.storage.upload(bucket, &storage::object_path(owner, ext), &bytes).await,
            Err(e) => Err(e),
        };
        return stored.map_err(|e| {
            let status = storage_error_to_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, bucket = bucket.as_str(), "upload failed");
            }
            status
        });
    }
    Err(StatusCode::BAD_REQUEST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        assert_eq!(
            storage_error_to_status(&StorageError::UnsupportedType("text/plain".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(storage_error_to_status(&StorageError::TooLarge(1)), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(storage_error_to_status(&StorageError::Empty), StatusCode::BAD_REQUEST);
        let io = std::io::Error::other("disk");
        assert_eq!(storage_error_to_status(&StorageError::Io(io)), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn payment_errors_map_to_statuses() {
        assert_eq!(payment_error_to_status(&PaymentError::Rejected), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(payment_error_to_status(&PaymentError::Decode("<html>".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(payment_error_to_status(&PaymentError::Http("reset".into())), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn anonymous_viewer_is_sent_to_login() {
        let Json(resolution) = resolve_page(
            auth::MaybeAuthUser(None),
            Query(ResolveQuery { path: "/bookings".into() }),
        )
        .await;
        assert_eq!(resolution, Resolution::Redirect { to: "/login?redirect=/bookings".into() });
    }

    #[tokio::test]
    async fn router_builds_with_test_state() {
        let _app = app(crate::state::test_helpers::test_app_state());
    }
}
