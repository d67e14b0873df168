//! Account service: signup, password login and the MFA code challenge.
//!
//! ARCHITECTURE
//! ============
//! Login is a small state machine:
//!
//! ```text
//! Credentials ──ok, mfa off──▶ Authenticated
//!      │
//!      └──ok, mfa on──▶ MfaRequired(challenge) ──code ok──▶ Authenticated
//! ```
//!
//! A challenge row holds the SHA-256 of a six-character code, expires after
//! ten minutes and is consumed on success or after five wrong codes. The
//! caller turns `Authenticated` into a session.

use std::num::NonZeroU32;

use rand::Rng;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::MailConfig;
use crate::services::session::bytes_to_hex;
use crate::validation::{self, FieldErrors};
use crate::wizard::{self, SignupForm};

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_FAILED_ATTEMPTS: i32 = 5;
const MFA_CODE_TEMPLATE: &str = include_str!("../../templates/mfa_code.html");

const PASSWORD_SCHEME: &str = "pbkdf2-sha256";
const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = 32;
static PBKDF2_ALG: ring::pbkdf2::Algorithm = ring::pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signup")]
    Invalid(FieldErrors),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("malformed password hash")]
    MalformedHash,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("email delivery failed: {0}")]
    EmailDelivery(String),
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

fn iterations(n: u32) -> Result<NonZeroU32, AuthError> {
    NonZeroU32::new(n).ok_or(AuthError::MalformedHash)
}

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`.
///
/// # Errors
///
/// Only fails if the iteration constant is zero.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let mut out = [0u8; CREDENTIAL_LEN];
    ring::pbkdf2::derive(PBKDF2_ALG, iterations(PBKDF2_ITERATIONS)?, &salt, password.as_bytes(), &mut out);
    Ok(format!("{PASSWORD_SCHEME}${PBKDF2_ITERATIONS}${}${}", bytes_to_hex(&salt), bytes_to_hex(&out)))
}

/// Check a password against a stored hash in constant time.
///
/// # Errors
///
/// Returns `MalformedHash` if the stored value is not in the expected format.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(PASSWORD_SCHEME), Some(iter), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedHash);
    };
    let iter: u32 = iter.parse().map_err(|_| AuthError::MalformedHash)?;
    let salt = hex_to_bytes(salt).ok_or(AuthError::MalformedHash)?;
    let hash = hex_to_bytes(hash).ok_or(AuthError::MalformedHash)?;

    Ok(ring::pbkdf2::verify(PBKDF2_ALG, iterations(iter)?, &salt, password.as_bytes(), &hash).is_ok())
}

// =============================================================================
// MFA CODES
// =============================================================================

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN || !normalized.bytes().all(|c| CODE_ALPHABET.contains(&c)) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[must_use]
pub fn hash_code(code: &str) -> String {
    bytes_to_hex(&Sha256::digest(code.as_bytes()))
}

#[must_use]
pub fn render_code_email(name: &str, code: &str) -> String {
    MFA_CODE_TEMPLATE.replace("{{NAME}}", name).replace("{{CODE}}", code)
}

/// Mail the code when Resend is configured; otherwise log it for local use.
///
/// # Errors
///
/// Returns `EmailDelivery` if the Resend API call fails.
pub async fn deliver_code(mail: Option<&MailConfig>, to_email: &str, name: &str, code: &str) -> Result<(), AuthError> {
    let Some(mail) = mail else {
        tracing::debug!(email = to_email, code, "mail not configured; mfa code not sent");
        return Ok(());
    };

    let resend = Resend::new(&mail.resend_api_key);
    let html = render_code_email(name, code);
    let email = CreateEmailBaseOptions::new(&mail.from, [to_email], "Your Sportsbnb sign-in code").with_html(&html);
    resend
        .emails
        .send(email)
        .await
        .map_err(|e| AuthError::EmailDelivery(e.to_string()))?;
    Ok(())
}

// =============================================================================
// SIGNUP
// =============================================================================

/// Validate the signup form and create the profile. Returns the new user id.
///
/// # Errors
///
/// `Invalid` carries per-field messages and means nothing was written;
/// `EmailTaken` if the address is already registered.
pub async fn signup(pool: &PgPool, form: &SignupForm) -> Result<Uuid, AuthError> {
    wizard::validate_all(form).map_err(AuthError::Invalid)?;
    let email = validation::normalize_email(&form.email).ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address");
        AuthError::Invalid(errors)
    })?;
    let password_hash = hash_password(&form.password)?;
    let phone = form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let inserted = sqlx::query_scalar::<_, Uuid>(
        r"INSERT INTO profiles (email, password_hash, full_name, role, phone)
          VALUES ($1, $2, $3, $4, $5)
          ON CONFLICT (email) DO NOTHING
          RETURNING id",
    )
    .bind(&email)
    .bind(password_hash)
    .bind(form.full_name.trim())
    .bind(form.role)
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    let id = inserted.ok_or(AuthError::EmailTaken)?;
    tracing::info!(user_id = %id, role = form.role.as_str(), "account created");
    Ok(id)
}

// =============================================================================
// LOGIN
// =============================================================================

/// Where a login attempt ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { user_id: Uuid },
    MfaRequired { challenge_id: Uuid, code: String, email: String, name: String },
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    full_name: String,
    password_hash: String,
    mfa_enabled: bool,
}

/// Check email and password. With MFA enabled a fresh challenge replaces any
/// outstanding one and its plaintext code is returned for delivery.
///
/// # Errors
///
/// `InvalidCredentials` for an unknown email or a wrong password.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
    let email = validation::normalize_email(email).ok_or(AuthError::InvalidCredentials)?;
    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, email, full_name, password_hash, mfa_enabled FROM profiles WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &row.password_hash)? {
        tracing::info!(user_id = %row.id, "login rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    if !row.mfa_enabled {
        return Ok(LoginOutcome::Authenticated { user_id: row.id });
    }

    sqlx::query("DELETE FROM login_challenges WHERE user_id = $1 AND consumed_at IS NULL")
        .bind(row.id)
        .execute(pool)
        .await?;

    let code = generate_code();
    let challenge_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO login_challenges (user_id, code_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(row.id)
    .bind(hash_code(&code))
    .fetch_one(pool)
    .await?;

    Ok(LoginOutcome::MfaRequired { challenge_id, code, email: row.email, name: row.full_name })
}

/// Complete an MFA challenge. Returns the user id on success.
///
/// # Errors
///
/// `InvalidCode` for a malformed code; `VerificationFailed` for a wrong,
/// expired or already consumed challenge.
pub async fn verify_mfa(pool: &PgPool, challenge_id: Uuid, code: &str) -> Result<Uuid, AuthError> {
    let code = normalize_code(code).ok_or(AuthError::InvalidCode)?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        r"UPDATE login_challenges
          SET consumed_at = now()
          WHERE id = $1
            AND consumed_at IS NULL
            AND expires_at > now()
            AND code_hash = $2
          RETURNING user_id",
    )
    .bind(challenge_id)
    .bind(hash_code(&code))
    .fetch_optional(pool)
    .await?;

    if let Some(user_id) = user_id {
        return Ok(user_id);
    }

    sqlx::query(
        r"UPDATE login_challenges
          SET attempts = attempts + 1,
              consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
          WHERE id = $1 AND consumed_at IS NULL AND expires_at > now()",
    )
    .bind(challenge_id)
    .bind(MAX_FAILED_ATTEMPTS)
    .execute(pool)
    .await?;
    Err(AuthError::VerificationFailed)
}

/// Turn the second factor on or off for a user.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn set_mfa_enabled(pool: &PgPool, user_id: Uuid, enabled: bool) -> Result<(), AuthError> {
    sqlx::query("UPDATE profiles SET mfa_enabled = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(enabled)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
