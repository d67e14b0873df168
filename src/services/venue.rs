//! Venue service: public listing, detail, and owner management.
//!
//! DESIGN
//! ======
//! Listing reads every active venue with its rating aggregate in one query
//! and hands the rows to [`crate::discovery`] for filtering and ordering.
//! Prices are stored as the owner's hourly price; the customer price (owner
//! price plus service fee) is filled in after the fetch so every response
//! agrees with the configured fee.
//!
//! Deleting a venue only clears `is_active`, so bookings and reviews keep
//! their foreign keys.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::availability::DayHours;
use crate::config::PricingConfig;
use crate::pricing::PriceDisplay;
use crate::services::session::SessionUser;
use crate::validation::FieldErrors;
use crate::wizard::{self, MAX_VENUE_IMAGES, VenueDraft};

#[derive(Debug, thiserror::Error)]
pub enum VenueError {
    #[error("venue not found")]
    NotFound,
    #[error("not the owner of this venue")]
    Forbidden,
    #[error("invalid venue")]
    Invalid(FieldErrors),
    #[error("venue already has {MAX_VENUE_IMAGES} images")]
    TooManyImages,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Card-sized venue record used by browse pages and dashboards.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VenueSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price_per_hour: i64,
    pub sports: Vec<String>,
    pub amenities: Vec<String>,
    pub image_urls: Vec<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
    #[sqlx(skip)]
    pub customer_price: i64,
    #[sqlx(skip)]
    pub price_label: String,
    #[sqlx(skip)]
    pub distance_km: Option<f64>,
}

impl VenueSummary {
    /// Fill in the fee-inclusive price fields.
    #[must_use]
    pub fn priced(mut self, pricing: &PricingConfig) -> Self {
        let display = PriceDisplay::for_owner_price(self.price_per_hour, pricing);
        self.customer_price = display.customer_price;
        self.price_label = display.formatted;
        self
    }
}

/// Venue page payload.
#[derive(Debug, Clone, Serialize)]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: VenueSummary,
    pub owner_name: String,
    pub hours: Vec<DayHours>,
}

const SUMMARY_SELECT: &str = r"
    SELECT v.id, v.owner_id, v.name, v.description, v.address, v.city, v.latitude, v.longitude,
           v.price_per_hour, v.sports, v.amenities, v.image_urls, v.is_active, v.created_at,
           r.avg_rating, COALESCE(r.review_count, 0) AS review_count
    FROM venues v
    LEFT JOIN (
        SELECT venue_id, AVG(rating)::float8 AS avg_rating, COUNT(*) AS review_count
        FROM reviews
        GROUP BY venue_id
    ) r ON r.venue_id = v.id";

// =============================================================================
// READS
// =============================================================================

/// All active venues, priced. Filtering and ordering happen in discovery.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_active(pool: &PgPool, pricing: &PricingConfig) -> Result<Vec<VenueSummary>, VenueError> {
    let rows = sqlx::query_as::<_, VenueSummary>(&format!("{SUMMARY_SELECT} WHERE v.is_active"))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|v| v.priced(pricing)).collect())
}

/// Venues of one owner, inactive included, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_owner(
    pool: &PgPool,
    owner_id: Uuid,
    pricing: &PricingConfig,
) -> Result<Vec<VenueSummary>, VenueError> {
    let rows = sqlx::query_as::<_, VenueSummary>(&format!(
        "{SUMMARY_SELECT} WHERE v.owner_id = $1 ORDER BY v.created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|v| v.priced(pricing)).collect())
}

async fn fetch_summary(pool: &PgPool, venue_id: Uuid) -> Result<VenueSummary, VenueError> {
    sqlx::query_as::<_, VenueSummary>(&format!("{SUMMARY_SELECT} WHERE v.id = $1"))
        .bind(venue_id)
        .fetch_optional(pool)
        .await?
        .ok_or(VenueError::NotFound)
}

/// Active venue with owner name and weekly hours.
///
/// # Errors
///
/// `NotFound` for unknown or deactivated venues.
pub async fn get_detail(pool: &PgPool, venue_id: Uuid, pricing: &PricingConfig) -> Result<VenueDetail, VenueError> {
    let venue = fetch_summary(pool, venue_id).await?;
    if !venue.is_active {
        return Err(VenueError::NotFound);
    }
    let owner_name: String = sqlx::query_scalar("SELECT full_name FROM profiles WHERE id = $1")
        .bind(venue.owner_id)
        .fetch_one(pool)
        .await?;
    let hours = crate::services::hours::get_hours(pool, venue_id).await?;

    Ok(VenueDetail { venue: venue.priced(pricing), owner_name, hours })
}

/// The venue's owner id, if the venue exists.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn owner_of(pool: &PgPool, venue_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT owner_id FROM venues WHERE id = $1")
        .bind(venue_id)
        .fetch_optional(pool)
        .await
}

/// Ensure `user` may manage the venue. Admins may manage any venue.
///
/// # Errors
///
/// `NotFound` if the venue does not exist; `Forbidden` otherwise.
pub async fn ensure_manager(pool: &PgPool, venue_id: Uuid, user: &SessionUser) -> Result<(), VenueError> {
    let owner = owner_of(pool, venue_id).await?.ok_or(VenueError::NotFound)?;
    if can_manage(owner, user) { Ok(()) } else { Err(VenueError::Forbidden) }
}

#[must_use]
pub fn can_manage(owner_id: Uuid, user: &SessionUser) -> bool {
    user.is_admin() || (user.is_owner() && user.id == owner_id)
}

// =============================================================================
// WRITES
// =============================================================================

/// Insert a venue and its weekly hours in one transaction.
///
/// # Errors
///
/// `Invalid` if any wizard step fails; nothing is written in that case.
pub async fn create(
    pool: &PgPool,
    owner: &SessionUser,
    draft: &VenueDraft,
    pricing: &PricingConfig,
) -> Result<VenueSummary, VenueError> {
    if !owner.is_owner() {
        return Err(VenueError::Forbidden);
    }
    wizard::validate_all(draft).map_err(VenueError::Invalid)?;

    let mut tx = pool.begin().await?;
    let venue_id: Uuid = sqlx::query_scalar(
        r"INSERT INTO venues
              (owner_id, name, description, address, city, latitude, longitude,
               price_per_hour, sports, amenities, image_urls)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
          RETURNING id",
    )
    .bind(owner.id)
    .bind(draft.name.trim())
    .bind(draft.description.trim())
    .bind(draft.address.trim())
    .bind(draft.city.trim())
    .bind(draft.latitude)
    .bind(draft.longitude)
    .bind(draft.price_per_hour)
    .bind(&draft.sports)
    .bind(&draft.amenities)
    .bind(&draft.image_urls)
    .fetch_one(&mut *tx)
    .await?;

    crate::services::hours::write_hours(&mut tx, venue_id, &draft.hours_or_default()).await?;
    tx.commit().await?;

    tracing::info!(%venue_id, owner_id = %owner.id, "venue created");
    Ok(fetch_summary(pool, venue_id).await?.priced(pricing))
}

/// Replace the listing fields. Hours are replaced only when supplied.
///
/// # Errors
///
/// `Forbidden` unless `user` manages the venue; `Invalid` on a bad draft.
pub async fn update(
    pool: &PgPool,
    user: &SessionUser,
    venue_id: Uuid,
    draft: &VenueDraft,
    pricing: &PricingConfig,
) -> Result<VenueSummary, VenueError> {
    ensure_manager(pool, venue_id, user).await?;
    wizard::validate_all(draft).map_err(VenueError::Invalid)?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r"UPDATE venues SET
              name = $2, description = $3, address = $4, city = $5, latitude = $6, longitude = $7,
              price_per_hour = $8, sports = $9, amenities = $10, image_urls = $11, updated_at = now()
          WHERE id = $1",
    )
    .bind(venue_id)
    .bind(draft.name.trim())
    .bind(draft.description.trim())
    .bind(draft.address.trim())
    .bind(draft.city.trim())
    .bind(draft.latitude)
    .bind(draft.longitude)
    .bind(draft.price_per_hour)
    .bind(&draft.sports)
    .bind(&draft.amenities)
    .bind(&draft.image_urls)
    .execute(&mut *tx)
    .await?;

    if let Some(hours) = &draft.hours {
        crate::services::hours::write_hours(&mut tx, venue_id, hours).await?;
    }
    tx.commit().await?;

    Ok(fetch_summary(pool, venue_id).await?.priced(pricing))
}

/// Soft delete.
///
/// # Errors
///
/// `Forbidden` unless `user` manages the venue.
pub async fn deactivate(pool: &PgPool, user: &SessionUser, venue_id: Uuid) -> Result<(), VenueError> {
    ensure_manager(pool, venue_id, user).await?;
    sqlx::query("UPDATE venues SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(venue_id)
        .execute(pool)
        .await?;
    tracing::info!(%venue_id, user_id = %user.id, "venue deactivated");
    Ok(())
}

/// Append an uploaded image URL.
///
/// # Errors
///
/// `TooManyImages` when the venue is already at the image limit.
pub async fn add_image(pool: &PgPool, user: &SessionUser, venue_id: Uuid, url: &str) -> Result<Vec<String>, VenueError> {
    ensure_manager(pool, venue_id, user).await?;
    let max = i32::try_from(MAX_VENUE_IMAGES).unwrap_or(i32::MAX);
    let images: Option<Vec<String>> = sqlx::query_scalar(
        r"UPDATE venues SET image_urls = array_append(image_urls, $2), updated_at = now()
          WHERE id = $1 AND cardinality(image_urls) < $3
          RETURNING image_urls",
    )
    .bind(venue_id)
    .bind(url)
    .bind(max)
    .fetch_optional(pool)
    .await?;
    images.ok_or(VenueError::TooManyImages)
}

#[cfg(test)]
#[path = "venue_test.rs"]
mod tests;
