//! Venue reviews. One per customer per venue, only after a confirmed booking.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::session::SessionUser;
use crate::validation::{self, FieldErrors};

pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("review not found")]
    NotFound,
    #[error("invalid review")]
    Invalid(FieldErrors),
    #[error("only customers with a confirmed booking can review")]
    NotEligible,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub user_id: Uuid,
    pub reviewer_name: String,
    pub reviewer_avatar_url: Option<String>,
    pub rating: i16,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

impl ReviewInput {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::check_range(&mut errors, "rating", self.rating, 1, 5);
        validation::check_max_len(&mut errors, "comment", &self.comment, MAX_COMMENT_LEN);
        errors
    }
}

const REVIEW_SELECT: &str = r"
    SELECT r.id, r.venue_id, r.user_id, p.full_name AS reviewer_name, p.avatar_url AS reviewer_avatar_url,
           r.rating, r.comment, r.created_at
    FROM reviews r
    JOIN profiles p ON p.id = r.user_id";

/// Newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_venue(pool: &PgPool, venue_id: Uuid) -> Result<Vec<Review>, ReviewError> {
    Ok(sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.venue_id = $1 ORDER BY r.created_at DESC"))
        .bind(venue_id)
        .fetch_all(pool)
        .await?)
}

/// Create or replace the user's review of a venue.
///
/// # Errors
///
/// `Invalid` for a bad rating or comment; `NotEligible` without a confirmed booking.
pub async fn upsert(pool: &PgPool, user: &SessionUser, venue_id: Uuid, input: &ReviewInput) -> Result<Review, ReviewError> {
    input.validate().into_result().map_err(ReviewError::Invalid)?;

    let eligible: bool = sqlx::query_scalar(
        r"SELECT EXISTS (
              SELECT 1 FROM bookings
              WHERE venue_id = $1 AND user_id = $2 AND status = 'confirmed'
          )",
    )
    .bind(venue_id)
    .bind(user.id)
    .fetch_one(pool)
    .await?;
    if !eligible {
        return Err(ReviewError::NotEligible);
    }

    let id: Uuid = sqlx::query_scalar(
        r"INSERT INTO reviews (venue_id, user_id, rating, comment) VALUES ($1, $2, $3, $4)
          ON CONFLICT (venue_id, user_id)
          DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, created_at = now()
          RETURNING id",
    )
    .bind(venue_id)
    .bind(user.id)
    .bind(input.rating)
    .bind(input.comment.trim())
    .fetch_one(pool)
    .await?;

    sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(ReviewError::NotFound)
}

/// Remove the user's own review; admins may remove any.
///
/// # Errors
///
/// `NotFound` if there is no such review the user may delete.
pub async fn delete(pool: &PgPool, user: &SessionUser, review_id: Uuid) -> Result<(), ReviewError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND (user_id = $2 OR $3)")
        .bind(review_id)
        .bind(user.id)
        .bind(user.is_admin())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ReviewError::NotFound);
    }
    Ok(())
}
