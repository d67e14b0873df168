//! Form validation: field-keyed error accumulation and shared field checks.
//!
//! Validators push messages into [`FieldErrors`]; a non-empty map means the
//! form is rejected before any write. Routes render it as a 422 body of the
//! shape `{ "errors": { "<field>": "<message>" } }`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Field key to first error message. Later messages for the same key are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_owned()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.errors {
            self.errors.entry(field).or_insert(message);
        }
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl IntoResponse for FieldErrors {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).into_response()
    }
}

// =============================================================================
// FIELD CHECKS
// =============================================================================

pub fn require(errors: &mut FieldErrors, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required"));
    }
}

/// Trim, lowercase and sanity-check an email address.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    if normalized.chars().any(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

pub fn check_email(errors: &mut FieldErrors, field: &str, email: &str) {
    if normalize_email(email).is_none() {
        errors.add(field, "Enter a valid email address");
    }
}

pub fn check_password(errors: &mut FieldErrors, password: &str, confirm_password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    if password != confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }
}

pub fn check_phone(errors: &mut FieldErrors, field: &str, phone: &str) {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    if !allowed || !(7..=15).contains(&digits) {
        errors.add(field, "Enter a valid phone number");
    }
}

pub fn check_range<T: PartialOrd + std::fmt::Display>(errors: &mut FieldErrors, field: &str, value: T, min: T, max: T) {
    if value < min || value > max {
        errors.add(field, format!("Must be between {min} and {max}"));
    }
}

pub fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("Must be at most {max} characters"));
    }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
