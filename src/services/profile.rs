//! Profile service: own and public profiles, edits, onboarding, avatar.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Role, SkillLevel};
use crate::validation::{self, FieldErrors};
use crate::wizard::{self, OwnerOnboarding, PlayerOnboarding};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile not found")]
    NotFound,
    #[error("invalid profile")]
    Invalid(FieldErrors),
    #[error("onboarding does not match role {0:?}")]
    WrongRole(Role),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Everything the owner of a profile may see.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub business_name: Option<String>,
    pub avatar_url: Option<String>,
    pub sports: Vec<String>,
    pub skill_level: Option<SkillLevel>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub onboarding_completed: bool,
    pub mfa_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What other users see: no contact details or coordinates.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub city: Option<String>,
    pub avatar_url: Option<String>,
    pub sports: Vec<String>,
    pub skill_level: Option<SkillLevel>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub sports: Option<Vec<String>>,
    pub skill_level: Option<SkillLevel>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.full_name {
            validation::require(&mut errors, "full_name", name, "Full name");
            validation::check_max_len(&mut errors, "full_name", name, 100);
        }
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            validation::check_phone(&mut errors, "phone", phone);
        }
        if let Some(unknown) = self
            .sports
            .iter()
            .flatten()
            .find(|s| !crate::domain::is_known_sport(s))
        {
            errors.add("sports", format!("Unknown sport: {unknown}"));
        }
        errors
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, phone, city, business_name, avatar_url, sports, \
     skill_level, latitude, longitude, onboarding_completed, mfa_enabled, created_at";

/// # Errors
///
/// `NotFound` if the user does not exist.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile, ProfileError> {
    sqlx::query_as::<_, Profile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ProfileError::NotFound)
}

/// # Errors
///
/// `NotFound` if the user does not exist.
pub async fn get_public_profile(pool: &PgPool, user_id: Uuid) -> Result<PublicProfile, ProfileError> {
    sqlx::query_as::<_, PublicProfile>(
        "SELECT id, full_name, role, city, avatar_url, sports, skill_level FROM profiles WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ProfileError::NotFound)
}

/// # Errors
///
/// `Invalid` if a supplied field fails validation.
pub async fn update_profile(pool: &PgPool, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile, ProfileError> {
    update.validate().into_result().map_err(ProfileError::Invalid)?;

    let phone = update.phone.as_deref().map(str::trim);
    sqlx::query(
        r"UPDATE profiles SET
              full_name = COALESCE($2, full_name),
              phone = CASE WHEN $3::text IS NULL THEN phone ELSE NULLIF($3, '') END,
              city = COALESCE($4, city),
              sports = COALESCE($5, sports),
              skill_level = COALESCE($6, skill_level),
              updated_at = now()
          WHERE id = $1",
    )
    .bind(user_id)
    .bind(update.full_name.as_deref().map(str::trim))
    .bind(phone)
    .bind(update.city.as_deref().map(str::trim))
    .bind(update.sports.as_deref())
    .bind(update.skill_level)
    .execute(pool)
    .await?;

    get_profile(pool, user_id).await
}

/// Store the player wizard's answers and mark onboarding complete.
///
/// # Errors
///
/// `WrongRole` for non-players; `Invalid` if any wizard step fails.
pub async fn complete_player_onboarding(
    pool: &PgPool,
    user_id: Uuid,
    role: Role,
    form: &PlayerOnboarding,
) -> Result<Profile, ProfileError> {
    if role != Role::Player {
        return Err(ProfileError::WrongRole(role));
    }
    wizard::validate_all(form).map_err(ProfileError::Invalid)?;

    sqlx::query(
        r"UPDATE profiles SET
              sports = $2, skill_level = $3, city = $4, latitude = $5, longitude = $6,
              onboarding_completed = TRUE, updated_at = now()
          WHERE id = $1",
    )
    .bind(user_id)
    .bind(&form.sports)
    .bind(form.skill_level)
    .bind(form.city.trim())
    .bind(form.latitude)
    .bind(form.longitude)
    .execute(pool)
    .await?;

    tracing::info!(%user_id, "player onboarding completed");
    get_profile(pool, user_id).await
}

/// Store the owner wizard's answers and mark onboarding complete.
///
/// # Errors
///
/// `WrongRole` for non-owners; `Invalid` if any wizard step fails.
pub async fn complete_owner_onboarding(
    pool: &PgPool,
    user_id: Uuid,
    role: Role,
    form: &OwnerOnboarding,
) -> Result<Profile, ProfileError> {
    if role != Role::Owner {
        return Err(ProfileError::WrongRole(role));
    }
    wizard::validate_all(form).map_err(ProfileError::Invalid)?;

    sqlx::query(
        r"UPDATE profiles SET
              business_name = $2, phone = $3, city = $4,
              onboarding_completed = TRUE, updated_at = now()
          WHERE id = $1",
    )
    .bind(user_id)
    .bind(form.business_name.trim())
    .bind(form.phone.trim())
    .bind(form.city.trim())
    .execute(pool)
    .await?;

    tracing::info!(%user_id, "owner onboarding completed");
    get_profile(pool, user_id).await
}

/// # Errors
///
/// `NotFound` if the user does not exist.
pub async fn set_avatar_url(pool: &PgPool, user_id: Uuid, url: &str) -> Result<(), ProfileError> {
    let result = sqlx::query("UPDATE profiles SET avatar_url = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(url)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ProfileError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_valid() {
        assert!(ProfileUpdate::default().validate().is_empty());
    }

    #[test]
    fn update_rejects_blank_name_and_bad_phone() {
        let update = ProfileUpdate {
            full_name: Some("   ".into()),
            phone: Some("call me".into()),
            ..ProfileUpdate::default()
        };
        let errors = update.validate();
        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("phone"), Some("Enter a valid phone number"));
    }

    #[test]
    fn update_allows_clearing_phone() {
        let update = ProfileUpdate { phone: Some(String::new()), ..ProfileUpdate::default() };
        assert!(update.validate().is_empty());
    }

    #[test]
    fn update_rejects_unknown_sport() {
        let update = ProfileUpdate { sports: Some(vec!["quidditch".into()]), ..ProfileUpdate::default() };
        assert_eq!(update.validate().get("sports"), Some("Unknown sport: quidditch"));
    }

    #[tokio::test]
    async fn owner_cannot_submit_player_onboarding() {
        let state = crate::state::test_helpers::test_app_state();
        let err = complete_player_onboarding(&state.pool, Uuid::new_v4(), Role::Owner, &PlayerOnboarding::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::WrongRole(Role::Owner)));
    }

    #[tokio::test]
    async fn incomplete_owner_onboarding_is_invalid() {
        let state = crate::state::test_helpers::test_app_state();
        let err = complete_owner_onboarding(&state.pool, Uuid::new_v4(), Role::Owner, &OwnerOnboarding::default())
            .await
            .unwrap_err();
        let ProfileError::Invalid(errors) = err else { panic!("expected Invalid") };
        assert!(errors.get("business_name").is_some());
        assert!(errors.get("phone").is_some());
    }
}
