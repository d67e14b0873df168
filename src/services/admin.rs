//! Admin console: platform counters, user list, role changes.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::Role;
use crate::services::session::{self, SessionUser};

pub const DEFAULT_USER_PAGE: i64 = 50;
pub const MAX_USER_PAGE: i64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("admin only")]
    Forbidden,
    #[error("user not found")]
    NotFound,
    #[error("admins cannot change their own role")]
    SelfDemotion,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct PlatformStats {
    pub players: i64,
    pub owners: i64,
    pub admins: i64,
    pub active_venues: i64,
    pub upcoming_games: i64,
    pub bookings: i64,
    pub confirmed_bookings: i64,
    /// Sum of confirmed booking totals.
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub onboarding_completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl UserListQuery {
    #[must_use]
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_USER_PAGE).clamp(1, MAX_USER_PAGE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }

    fn pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
    }
}

/// # Errors
///
/// `Forbidden` for non-admins.
pub fn require_admin(user: &SessionUser) -> Result<(), AdminError> {
    if user.is_admin() { Ok(()) } else { Err(AdminError::Forbidden) }
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn stats(pool: &PgPool) -> Result<PlatformStats, AdminError> {
    Ok(sqlx::query_as::<_, PlatformStats>(
        r"SELECT
              (SELECT COUNT(*) FROM profiles WHERE role = 'player') AS players,
              (SELECT COUNT(*) FROM profiles WHERE role = 'owner') AS owners,
              (SELECT COUNT(*) FROM profiles WHERE role = 'admin') AS admins,
              (SELECT COUNT(*) FROM venues WHERE is_active) AS active_venues,
              (SELECT COUNT(*) FROM games WHERE game_date >= CURRENT_DATE AND status IN ('open', 'full')) AS upcoming_games,
              (SELECT COUNT(*) FROM bookings) AS bookings,
              (SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS confirmed_bookings,
              (SELECT COALESCE(SUM(total_price), 0)::bigint FROM bookings WHERE status = 'confirmed') AS revenue",
    )
    .fetch_one(pool)
    .await?)
}

/// Newest accounts first, optionally filtered by role and name/email text.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_users(pool: &PgPool, query: &UserListQuery) -> Result<Vec<UserRow>, AdminError> {
    let (limit, offset) = query.page();
    Ok(sqlx::query_as::<_, UserRow>(
        r"SELECT id, email, full_name, role, onboarding_completed, created_at
          FROM profiles
          WHERE ($1::text IS NULL OR role = $1)
            AND ($2::text IS NULL OR email ILIKE $2 OR full_name ILIKE $2)
          ORDER BY created_at DESC
          LIMIT $3 OFFSET $4",
    )
    .bind(query.role)
    .bind(query.pattern())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?)
}

/// Change a user's role and drop their sessions so the new role applies at
/// next sign-in.
///
/// # Errors
///
/// `SelfDemotion` when an admin targets themselves; `NotFound` for unknown users.
pub async fn set_role(pool: &PgPool, admin: &SessionUser, user_id: Uuid, role: Role) -> Result<(), AdminError> {
    require_admin(admin)?;
    if admin.id == user_id {
        return Err(AdminError::SelfDemotion);
    }
    let result = sqlx::query("UPDATE profiles SET role = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AdminError::NotFound);
    }
    let dropped = session::delete_user_sessions(pool, user_id).await?;
    tracing::info!(admin_id = %admin.id, %user_id, role = role.as_str(), dropped, "role changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            full_name: "A".into(),
            role,
            avatar_url: None,
            onboarding_completed: true,
        }
    }

    #[test]
    fn only_admins_pass() {
        assert!(require_admin(&user(Role::Admin)).is_ok());
        assert!(matches!(require_admin(&user(Role::Owner)), Err(AdminError::Forbidden)));
        assert!(matches!(require_admin(&user(Role::Player)), Err(AdminError::Forbidden)));
    }

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(UserListQuery::default().page(), (DEFAULT_USER_PAGE, 0));
        let q = UserListQuery { limit: Some(10_000), offset: Some(-3), ..UserListQuery::default() };
        assert_eq!(q.page(), (MAX_USER_PAGE, 0));
        let q = UserListQuery { limit: Some(0), ..UserListQuery::default() };
        assert_eq!(q.page().0, 1);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let q = UserListQuery { q: Some(" 50%_off ".into()), ..UserListQuery::default() };
        assert_eq!(q.pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(UserListQuery { q: Some("  ".into()), ..UserListQuery::default() }.pattern(), None);
    }

    #[tokio::test]
    async fn non_admin_cannot_set_role() {
        let state = crate::state::test_helpers::test_app_state();
        let err = set_role(&state.pool, &user(Role::Owner), Uuid::new_v4(), Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Forbidden));
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() {
        let state = crate::state::test_helpers::test_app_state();
        let admin = user(Role::Admin);
        let err = set_role(&state.pool, &admin, admin.id, Role::Player).await.unwrap_err();
        assert!(matches!(err, AdminError::SelfDemotion));
    }
}
