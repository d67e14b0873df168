//! Pickup games: listing, hosting, joining and leaving.
//!
//! DESIGN
//! ======
//! Capacity is enforced inside a transaction that locks the game row
//! (`SELECT .. FOR UPDATE`) before counting participants, so two players
//! racing for the last spot cannot both get in. The game flips to `full`
//! when the last spot is taken and back to `open` when someone leaves.
//!
//! Paid games are joined only after `verify-game-payment` confirms the
//! checkout session and names this game. The session id is stored on the
//! participant row under a unique constraint, so one checkout buys exactly
//! one spot.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::domain::{self, GameStatus, PaymentStatus, SkillLevel};
use crate::geo::Coordinate;
use crate::payments::{PaymentError, PaymentFunctions, VerifyGameResponse};
use crate::pricing;
use crate::services::session::SessionUser;
use crate::timefmt::{clock, iso_date};
use crate::validation::{self, FieldErrors};

pub const MIN_PLAYERS: i32 = 2;
pub const MAX_PLAYERS: i32 = 100;
pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;

const PAYMENT_SESSION_CONSTRAINT: &str = "game_participants_payment_session_key";

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("game not found")]
    NotFound,
    #[error("invalid game")]
    Invalid(FieldErrors),
    #[error("only the host can do that")]
    Forbidden,
    #[error("game is full")]
    Full,
    #[error("game is not open")]
    NotOpen,
    #[error("game has already been played")]
    AlreadyPlayed,
    #[error("already joined")]
    AlreadyJoined,
    #[error("not a participant")]
    NotJoined,
    #[error("the host cannot leave their own game")]
    HostCannotLeave,
    #[error("payment required")]
    PaymentRequired,
    #[error("payments are not configured")]
    PaymentsUnavailable,
    #[error("checkout session has already been used")]
    PaymentSessionUsed,
    #[error("checkout session was not for this game")]
    PaymentMismatch,
    #[error("payment verification failed: {0}")]
    Payment(#[from] PaymentError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Game card for the games page and dashboards.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GameSummary {
    pub id: Uuid,
    pub host_id: Uuid,
    pub host_name: String,
    pub venue_id: Option<Uuid>,
    pub title: String,
    pub sport: String,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(with = "iso_date")]
    pub game_date: Date,
    #[serde(with = "clock")]
    pub start_time: Time,
    pub duration_minutes: i32,
    pub max_players: i32,
    pub fee_per_player: i64,
    pub skill_level: SkillLevel,
    pub status: GameStatus,
    pub player_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[sqlx(skip)]
    pub fee_label: Option<String>,
    #[sqlx(skip)]
    pub distance_km: Option<f64>,
}

impl GameSummary {
    #[must_use]
    pub fn spots_left(&self) -> i64 {
        (i64::from(self.max_players) - self.player_count).max(0)
    }

    /// `None` for free games.
    #[must_use]
    pub fn priced(mut self, pricing: &PricingConfig) -> Self {
        self.fee_label =
            (self.fee_per_player > 0).then(|| pricing::format_price(self.fee_per_player, &pricing.currency_symbol));
        self
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Participant {
    pub user_id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub game: GameSummary,
    pub participants: Vec<Participant>,
}

/// Body of `POST /api/games`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGame {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub venue_id: Option<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(with = "iso_date")]
    pub game_date: Date,
    #[serde(with = "clock")]
    pub start_time: Time,
    pub duration_minutes: i32,
    pub max_players: i32,
    #[serde(default)]
    pub fee_per_player: i64,
    pub skill_level: Option<SkillLevel>,
}

impl NewGame {
    /// Field checks; `today` rejects games in the past.
    #[must_use]
    pub fn validate(&self, today: Date) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validation::require(&mut errors, "title", &self.title, "Title");
        validation::check_max_len(&mut errors, "title", &self.title, 120);
        validation::check_max_len(&mut errors, "description", &self.description, 2000);
        if !domain::is_known_sport(&self.sport) {
            errors.add("sport", "Pick a sport");
        }
        validation::require(&mut errors, "location", &self.location, "Location");
        match (self.latitude, self.longitude) {
            (None, None) => {}
            (Some(lat), Some(lng)) if Coordinate::new(lat, lng).is_valid() => {}
            _ => errors.add("location", "Coordinates are out of range"),
        }
        if self.game_date < today {
            errors.add("game_date", "Date cannot be in the past");
        }
        validation::check_range(&mut errors, "max_players", self.max_players, MIN_PLAYERS, MAX_PLAYERS);
        validation::check_range(
            &mut errors,
            "duration_minutes",
            self.duration_minutes,
            MIN_DURATION_MINUTES,
            MAX_DURATION_MINUTES,
        );
        if self.fee_per_player < 0 {
            errors.add("fee_per_player", "Fee cannot be negative");
        }
        errors
    }
}

/// The game row a join is checked against.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JoinTarget {
    pub title: String,
    pub game_date: Date,
    pub status: GameStatus,
    pub max_players: i32,
    pub fee_per_player: i64,
}

/// Join rules applied to the locked game row.
///
/// # Errors
///
/// `NotOpen`, `AlreadyPlayed`, `AlreadyJoined` or `Full`, checked in that order.
pub fn check_join(game: &JoinTarget, today: Date, player_count: i64, already_joined: bool) -> Result<(), GameError> {
    if !game.status.accepts_players() && game.status != GameStatus::Full {
        return Err(GameError::NotOpen);
    }
    if game.game_date < today {
        return Err(GameError::AlreadyPlayed);
    }
    if already_joined {
        return Err(GameError::AlreadyJoined);
    }
    if game.status == GameStatus::Full || player_count >= i64::from(game.max_players) {
        return Err(GameError::Full);
    }
    Ok(())
}

/// A verified checkout must be a completed payment for the game being joined.
///
/// # Errors
///
/// `Payment(Rejected)` for an incomplete payment, `PaymentMismatch` when the
/// checkout names another game or none at all.
pub fn check_paid_session(verified: &VerifyGameResponse, title: &str) -> Result<(), GameError> {
    if !verified.success {
        return Err(GameError::Payment(PaymentError::Rejected));
    }
    match verified.game_title.as_deref() {
        Some(paid_for) if paid_for.trim() == title.trim() => Ok(()),
        _ => Err(GameError::PaymentMismatch),
    }
}

fn is_session_reuse(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(PAYMENT_SESSION_CONSTRAINT))
}

/// Status after a join or leave changed the head count.
#[must_use]
pub fn status_for_count(current: GameStatus, player_count: i64, max_players: i32) -> GameStatus {
    match current {
        GameStatus::Open | GameStatus::Full if player_count >= i64::from(max_players) => GameStatus::Full,
        GameStatus::Open | GameStatus::Full => GameStatus::Open,
        other => other,
    }
}

const SUMMARY_SELECT: &str = r"
    SELECT g.id, g.host_id, h.full_name AS host_name, g.venue_id, g.title, g.sport, g.description,
           g.location, g.latitude, g.longitude, g.game_date, g.start_time, g.duration_minutes,
           g.max_players, g.fee_per_player, g.skill_level, g.status,
           (SELECT COUNT(*) FROM game_participants p WHERE p.game_id = g.id) AS player_count,
           g.created_at
    FROM games g
    JOIN profiles h ON h.id = g.host_id";

// =============================================================================
// READS
// =============================================================================

/// Non-cancelled games on or after `today`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_upcoming(pool: &PgPool, today: Date, pricing: &PricingConfig) -> Result<Vec<GameSummary>, GameError> {
    let rows = sqlx::query_as::<_, GameSummary>(&format!(
        "{SUMMARY_SELECT} WHERE g.game_date >= $1 AND g.status <> 'cancelled'"
    ))
    .bind(today)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|g| g.priced(pricing)).collect())
}

/// Games the user hosts or has joined, soonest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid, pricing: &PricingConfig) -> Result<Vec<GameSummary>, GameError> {
    let rows = sqlx::query_as::<_, GameSummary>(&format!(
        r"{SUMMARY_SELECT}
          WHERE g.host_id = $1
             OR EXISTS (SELECT 1 FROM game_participants p WHERE p.game_id = g.id AND p.user_id = $1)
          ORDER BY g.game_date, g.start_time"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|g| g.priced(pricing)).collect())
}

async fn fetch_summary(pool: &PgPool, game_id: Uuid) -> Result<GameSummary, GameError> {
    sqlx::query_as::<_, GameSummary>(&format!("{SUMMARY_SELECT} WHERE g.id = $1"))
        .bind(game_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GameError::NotFound)
}

/// # Errors
///
/// `NotFound` for unknown games.
pub async fn get_detail(pool: &PgPool, game_id: Uuid, pricing: &PricingConfig) -> Result<GameDetail, GameError> {
    let game = fetch_summary(pool, game_id).await?.priced(pricing);
    let participants = sqlx::query_as::<_, Participant>(
        r"SELECT p.user_id, pr.full_name, pr.avatar_url, p.payment_status, p.joined_at
          FROM game_participants p
          JOIN profiles pr ON pr.id = p.user_id
          WHERE p.game_id = $1
          ORDER BY p.joined_at",
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;
    Ok(GameDetail { game, participants })
}

// =============================================================================
// WRITES
// =============================================================================

/// Create a game; the host takes the first spot.
///
/// # Errors
///
/// `Invalid` on bad fields or an unknown or inactive venue.
pub async fn create(
    pool: &PgPool,
    host: &SessionUser,
    new: &NewGame,
    today: Date,
    pricing: &PricingConfig,
) -> Result<GameSummary, GameError> {
    let mut errors = new.validate(today);
    if let Some(venue_id) = new.venue_id {
        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_optional(pool)
            .await?;
        if active != Some(true) {
            errors.add("venue_id", "Venue not found");
        }
    }
    errors.into_result().map_err(GameError::Invalid)?;

    let mut tx = pool.begin().await?;
    let game_id: Uuid = sqlx::query_scalar(
        r"INSERT INTO games
              (host_id, venue_id, title, sport, description, location, latitude, longitude,
               game_date, start_time, duration_minutes, max_players, fee_per_player, skill_level)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
          RETURNING id",
    )
    .bind(host.id)
    .bind(new.venue_id)
    .bind(new.title.trim())
    .bind(&new.sport)
    .bind(new.description.trim())
    .bind(new.location.trim())
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.game_date)
    .bind(new.start_time)
    .bind(new.duration_minutes)
    .bind(new.max_players)
    .bind(new.fee_per_player)
    .bind(new.skill_level.unwrap_or(SkillLevel::Any))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO game_participants (game_id, user_id, payment_status) VALUES ($1, $2, 'free')")
        .bind(game_id)
        .bind(host.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(%game_id, host_id = %host.id, "game created");
    Ok(fetch_summary(pool, game_id).await?.priced(pricing))
}

const JOIN_TARGET_SELECT: &str =
    "SELECT title, game_date, status, max_players, fee_per_player FROM games WHERE id = $1";

/// Join a game. Paid games need the checkout `session_id`, verified through
/// the payment functions before the spot is taken.
///
/// # Errors
///
/// See [`check_join`] and [`check_paid_session`]; `PaymentRequired` when a
/// paid game is joined without a session id, `PaymentSessionUsed` when the
/// session already bought a spot.
pub async fn join(
    pool: &PgPool,
    payments: Option<&dyn PaymentFunctions>,
    user: &SessionUser,
    game_id: Uuid,
    session_id: Option<&str>,
    today: Date,
    pricing: &PricingConfig,
) -> Result<GameSummary, GameError> {
    let target = sqlx::query_as::<_, JoinTarget>(JOIN_TARGET_SELECT)
        .bind(game_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GameError::NotFound)?;
    if target.game_date < today {
        return Err(GameError::AlreadyPlayed);
    }

    let paid_session = if target.fee_per_player > 0 {
        let session_id = session_id.map(str::trim).filter(|s| !s.is_empty()).ok_or(GameError::PaymentRequired)?;
        let payments = payments.ok_or(GameError::PaymentsUnavailable)?;
        let used: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM game_participants WHERE payment_session_id = $1)")
                .bind(session_id)
                .fetch_one(pool)
                .await?;
        if used {
            return Err(GameError::PaymentSessionUsed);
        }
        let verified = payments.verify_game_payment(session_id).await?;
        if let Err(err) = check_paid_session(&verified, &target.title) {
            tracing::warn!(%game_id, user_id = %user.id, paid_for = ?verified.game_title, "checkout does not match game");
            return Err(err);
        }
        Some(session_id)
    } else {
        None
    };
    let payment_status = if paid_session.is_some() { PaymentStatus::Paid } else { PaymentStatus::Free };

    let mut tx = pool.begin().await?;
    let game = sqlx::query_as::<_, JoinTarget>(&format!("{JOIN_TARGET_SELECT} FOR UPDATE"))
        .bind(game_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GameError::NotFound)?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM game_participants WHERE game_id = $1")
        .bind(game_id)
        .fetch_one(&mut *tx)
        .await?;
    let already_joined: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM game_participants WHERE game_id = $1 AND user_id = $2)")
            .bind(game_id)
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;

    if let Err(err) = check_join(&game, today, count, already_joined) {
        if paid_session.is_some() {
            tracing::warn!(%game_id, user_id = %user.id, fee = game.fee_per_player, error = %err, "paid join rejected after verification");
        }
        return Err(err);
    }

    sqlx::query(
        r"INSERT INTO game_participants (game_id, user_id, payment_status, payment_session_id)
          VALUES ($1, $2, $3, $4)",
    )
    .bind(game_id)
    .bind(user.id)
    .bind(payment_status)
    .bind(paid_session)
    .execute(&mut *tx)
    .await
    .map_err(|e| if is_session_reuse(&e) { GameError::PaymentSessionUsed } else { GameError::Db(e) })?;
    let next = status_for_count(game.status, count + 1, game.max_players);
    if next != game.status {
        sqlx::query("UPDATE games SET status = $2 WHERE id = $1")
            .bind(game_id)
            .bind(next)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(%game_id, user_id = %user.id, "joined game");
    Ok(fetch_summary(pool, game_id).await?.priced(pricing))
}

/// Leave a game, reopening it if it was full.
///
/// # Errors
///
/// `HostCannotLeave` for the host; `NotJoined` if the user is not in the game.
pub async fn leave(pool: &PgPool, user: &SessionUser, game_id: Uuid) -> Result<(), GameError> {
    let mut tx = pool.begin().await?;
    let (host_id, status, max_players): (Uuid, GameStatus, i32) =
        sqlx::query_as("SELECT host_id, status, max_players FROM games WHERE id = $1 FOR UPDATE")
            .bind(game_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(GameError::NotFound)?;
    if host_id == user.id {
        return Err(GameError::HostCannotLeave);
    }

    let removed = sqlx::query("DELETE FROM game_participants WHERE game_id = $1 AND user_id = $2")
        .bind(game_id)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(GameError::NotJoined);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM game_participants WHERE game_id = $1")
        .bind(game_id)
        .fetch_one(&mut *tx)
        .await?;
    let next = status_for_count(status, count, max_players);
    if next != status {
        sqlx::query("UPDATE games SET status = $2 WHERE id = $1")
            .bind(game_id)
            .bind(next)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Cancel a game. Host or admin only.
///
/// # Errors
///
/// `Forbidden` for anyone else; `NotOpen` if it is already cancelled or completed.
pub async fn cancel(pool: &PgPool, user: &SessionUser, game_id: Uuid) -> Result<(), GameError> {
    let (host_id, status): (Uuid, GameStatus) = sqlx::query_as("SELECT host_id, status FROM games WHERE id = $1")
        .bind(game_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GameError::NotFound)?;
    if host_id != user.id && !user.is_admin() {
        return Err(GameError::Forbidden);
    }
    if matches!(status, GameStatus::Cancelled | GameStatus::Completed) {
        return Err(GameError::NotOpen);
    }

    sqlx::query("UPDATE games SET status = 'cancelled' WHERE id = $1")
        .bind(game_id)
        .execute(pool)
        .await?;
    tracing::info!(%game_id, user_id = %user.id, "game cancelled");
    Ok(())
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
