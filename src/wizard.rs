//! Multi-step form wizards.
//!
//! DESIGN
//! ======
//! A wizard is a linear step index over a form draft. Advancing validates the
//! current step only; going back never validates. `submit` re-validates every
//! step in order and, on the first failure, parks the index on that step so
//! the caller can show its errors. Nothing is persisted until a successful
//! submit hands the form back.

use serde::Deserialize;

use crate::availability::{self, DayHours};
use crate::domain::{self, Role, SkillLevel};
use crate::geo::Coordinate;
use crate::validation::{self, FieldErrors};

/// A form that can be filled in over several gated steps.
pub trait WizardForm {
    type Step: Copy + Eq + std::fmt::Debug + 'static;

    fn steps() -> &'static [Self::Step];

    fn validate_step(&self, step: Self::Step) -> FieldErrors;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WizardError<S: std::fmt::Debug> {
    #[error("step {step:?} has invalid fields")]
    Invalid { step: S, errors: FieldErrors },
    #[error("already on the last step")]
    AtLastStep,
}

#[derive(Debug, Clone)]
pub struct Wizard<F: WizardForm> {
    form: F,
    index: usize,
}

impl<F: WizardForm> Wizard<F> {
    #[must_use]
    pub fn new(form: F) -> Self {
        Self { form, index: 0 }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current_step(&self) -> F::Step {
        F::steps()[self.index]
    }

    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.index + 1 == F::steps().len()
    }

    /// Re-enter a wizard at `index`, clamped to the last step. Nothing is
    /// validated; use `advance` to gate forward moves.
    #[must_use]
    pub fn resume(form: F, index: usize) -> Self {
        Self { form, index: index.min(F::steps().len() - 1) }
    }

    #[cfg(test)]
    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    /// Validate the current step and move to the next one.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if the current step fails validation, or
    /// `AtLastStep` when there is no next step (use `submit`).
    pub fn advance(&mut self) -> Result<F::Step, WizardError<F::Step>> {
        if self.is_last_step() {
            return Err(WizardError::AtLastStep);
        }
        let step = self.current_step();
        let errors = self.form.validate_step(step);
        if !errors.is_empty() {
            return Err(WizardError::Invalid { step, errors });
        }
        self.index += 1;
        Ok(self.current_step())
    }

    /// Step back without validating. Stays put on the first step.
    pub fn back(&mut self) -> F::Step {
        self.index = self.index.saturating_sub(1);
        self.current_step()
    }

    /// Validate every step and hand back the completed form.
    ///
    /// # Errors
    ///
    /// Returns the first failing step with its errors; the wizard stays
    /// usable and points at that step.
    pub fn submit(mut self) -> Result<F, (Self, WizardError<F::Step>)> {
        for (i, step) in F::steps().iter().enumerate() {
            let errors = self.form.validate_step(*step);
            if !errors.is_empty() {
                self.index = i;
                return Err((self, WizardError::Invalid { step: *step, errors }));
            }
        }
        Ok(self.form)
    }
}

/// Validate a complete form in one go, as the HTTP handlers do.
///
/// # Errors
///
/// Returns the merged field errors of every failing step.
pub fn validate_all<F: WizardForm>(form: &F) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for step in F::steps() {
        errors.merge(form.validate_step(*step));
    }
    errors.into_result()
}

// =============================================================================
// SIGNUP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Account,
    Profile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
}

impl WizardForm for SignupForm {
    type Step = SignupStep;

    fn steps() -> &'static [SignupStep] {
        &[SignupStep::Account, SignupStep::Profile]
    }

    fn validate_step(&self, step: SignupStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            SignupStep::Account => {
                validation::check_email(&mut errors, "email", &self.email);
                validation::check_password(&mut errors, &self.password, &self.confirm_password);
            }
            SignupStep::Profile => {
                validation::require(&mut errors, "full_name", &self.full_name, "Full name");
                validation::check_max_len(&mut errors, "full_name", &self.full_name, 100);
                if self.role == Role::Admin {
                    errors.add("role", "Choose player or venue owner");
                }
                if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
                    validation::check_phone(&mut errors, "phone", phone);
                }
            }
        }
        errors
    }
}

// =============================================================================
// PLAYER ONBOARDING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStep {
    Sports,
    SkillLevel,
    Location,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerOnboarding {
    #[serde(default)]
    pub sports: Vec<String>,
    pub skill_level: Option<SkillLevel>,
    #[serde(default)]
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl WizardForm for PlayerOnboarding {
    type Step = PlayerStep;

    fn steps() -> &'static [PlayerStep] {
        &[PlayerStep::Sports, PlayerStep::SkillLevel, PlayerStep::Location]
    }

    fn validate_step(&self, step: PlayerStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            PlayerStep::Sports => check_sports(&mut errors, &self.sports),
            PlayerStep::SkillLevel => {
                if self.skill_level.is_none() {
                    errors.add("skill_level", "Pick a skill level");
                }
            }
            PlayerStep::Location => {
                validation::require(&mut errors, "city", &self.city, "City");
                check_coordinate(&mut errors, self.latitude, self.longitude);
            }
        }
        errors
    }
}

// =============================================================================
// OWNER ONBOARDING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerStep {
    Business,
    Contact,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerOnboarding {
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
}

impl WizardForm for OwnerOnboarding {
    type Step = OwnerStep;

    fn steps() -> &'static [OwnerStep] {
        &[OwnerStep::Business, OwnerStep::Contact]
    }

    fn validate_step(&self, step: OwnerStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            OwnerStep::Business => {
                validation::require(&mut errors, "business_name", &self.business_name, "Business name");
                validation::check_max_len(&mut errors, "business_name", &self.business_name, 120);
            }
            OwnerStep::Contact => {
                validation::check_phone(&mut errors, "phone", &self.phone);
                validation::require(&mut errors, "city", &self.city, "City");
            }
        }
        errors
    }
}

// =============================================================================
// VENUE CREATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueStep {
    Basics,
    Location,
    Pricing,
    Amenities,
    Hours,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub price_per_hour: i64,
    #[serde(default)]
    pub sports: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// `None` falls back to the default week.
    pub hours: Option<Vec<DayHours>>,
}

pub const MAX_VENUE_IMAGES: usize = 10;
pub const MAX_PRICE_PER_HOUR: i64 = 1_000_000;

impl VenueDraft {
    #[must_use]
    pub fn hours_or_default(&self) -> Vec<DayHours> {
        self.hours.clone().unwrap_or_else(availability::default_week)
    }
}

impl WizardForm for VenueDraft {
    type Step = VenueStep;

    fn steps() -> &'static [VenueStep] {
        &[VenueStep::Basics, VenueStep::Location, VenueStep::Pricing, VenueStep::Amenities, VenueStep::Hours]
    }

    fn validate_step(&self, step: VenueStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            VenueStep::Basics => {
                validation::require(&mut errors, "name", &self.name, "Venue name");
                validation::check_max_len(&mut errors, "name", &self.name, 120);
                validation::check_max_len(&mut errors, "description", &self.description, 2000);
            }
            VenueStep::Location => {
                validation::require(&mut errors, "address", &self.address, "Address");
                validation::require(&mut errors, "city", &self.city, "City");
                check_coordinate(&mut errors, self.latitude, self.longitude);
            }
            VenueStep::Pricing => {
                if self.price_per_hour <= 0 {
                    errors.add("price_per_hour", "Price must be greater than zero");
                } else {
                    validation::check_range(&mut errors, "price_per_hour", self.price_per_hour, 1, MAX_PRICE_PER_HOUR);
                }
                check_sports(&mut errors, &self.sports);
            }
            VenueStep::Amenities => {
                if let Some(unknown) = self.amenities.iter().find(|a| !domain::is_known_amenity(a)) {
                    errors.add("amenities", format!("Unknown amenity: {unknown}"));
                }
                if self.image_urls.len() > MAX_VENUE_IMAGES {
                    errors.add("image_urls", format!("At most {MAX_VENUE_IMAGES} images"));
                }
            }
            VenueStep::Hours => {
                if let Some(hours) = &self.hours {
                    errors.merge(availability::validate_week(hours));
                }
            }
        }
        errors
    }
}

// =============================================================================
// SHARED CHECKS
// =============================================================================

fn check_sports(errors: &mut FieldErrors, sports: &[String]) {
    if sports.is_empty() {
        errors.add("sports", "Pick at least one sport");
    } else if let Some(unknown) = sports.iter().find(|s| !domain::is_known_sport(s)) {
        errors.add("sports", format!("Unknown sport: {unknown}"));
    }
}

/// Coordinates are optional, but must come as a valid pair.
fn check_coordinate(errors: &mut FieldErrors, latitude: Option<f64>, longitude: Option<f64>) {
    match (latitude, longitude) {
        (None, None) => {}
        (Some(lat), Some(lon)) => {
            if !Coordinate::new(lat, lon).is_valid() {
                errors.add("location", "Coordinates are out of range");
            }
        }
        _ => errors.add("location", "Provide both latitude and longitude"),
    }
}

#[cfg(test)]
#[path = "wizard_test.rs"]
mod tests;
