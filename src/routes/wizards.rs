//! Step checks for the multi-step forms.
//!
//! The final submit of every wizard goes to its own endpoint (signup,
//! onboarding, venue create). These routes only answer "may the user move
//! past step N?", "where does Back land?" and "is the whole form ready?",
//! so the browser and the server gate steps identically.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::validation::FieldErrors;
use crate::wizard::{OwnerOnboarding, PlayerOnboarding, SignupForm, VenueDraft, Wizard, WizardError, WizardForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardKind {
    Signup,
    PlayerOnboarding,
    OwnerOnboarding,
    Venue,
}

#[derive(Debug, Deserialize)]
pub struct StepBody {
    /// Zero-based index of the step being left. Ignored by submit.
    #[serde(default)]
    pub step: usize,
    pub form: serde_json::Value,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StepProgress {
    pub step: usize,
    pub last_step: bool,
}

/// Where a failed submit parked the wizard.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Parked {
    pub step: usize,
    #[serde(flatten)]
    pub errors: FieldErrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Advance,
    Back,
    Submit,
}

/// Replay the wizard through `step` and move past it. Earlier steps are
/// re-validated, so a client cannot skip ahead with stale answers.
pub(crate) fn advance_from<F: WizardForm>(form: F, step: usize) -> Result<StepProgress, WizardError<F::Step>> {
    let mut wizard = Wizard::new(form);
    while wizard.index() <= step {
        wizard.advance()?;
    }
    Ok(StepProgress { step: wizard.index(), last_step: wizard.is_last_step() })
}

pub(crate) fn back_from<F: WizardForm>(form: F, step: usize) -> StepProgress {
    let mut wizard = Wizard::resume(form, step);
    wizard.back();
    StepProgress { step: wizard.index(), last_step: wizard.is_last_step() }
}

pub(crate) fn check_submit<F: WizardForm>(form: F) -> Result<(), Parked> {
    match Wizard::new(form).submit() {
        Ok(_) => Ok(()),
        Err((wizard, WizardError::Invalid { errors, .. })) => Err(Parked { step: wizard.index(), errors }),
        Err((wizard, WizardError::AtLastStep)) => Err(Parked { step: wizard.index(), errors: FieldErrors::new() }),
    }
}

fn run<F: WizardForm + DeserializeOwned>(body: StepBody, action: Move) -> Response {
    let form: F = match serde_json::from_value(body.form) {
        Ok(form) => form,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    match action {
        Move::Advance => match advance_from(form, body.step) {
            Ok(progress) => Json(progress).into_response(),
            Err(WizardError::Invalid { errors, .. }) => errors.into_response(),
            Err(err @ WizardError::AtLastStep) => (StatusCode::CONFLICT, err.to_string()).into_response(),
        },
        Move::Back => Json(back_from(form, body.step)).into_response(),
        Move::Submit => match check_submit(form) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(parked) => (StatusCode::UNPROCESSABLE_ENTITY, Json(parked)).into_response(),
        },
    }
}

fn dispatch(kind: WizardKind, body: StepBody, action: Move) -> Response {
    match kind {
        WizardKind::Signup => run::<SignupForm>(body, action),
        WizardKind::PlayerOnboarding => run::<PlayerOnboarding>(body, action),
        WizardKind::OwnerOnboarding => run::<OwnerOnboarding>(body, action),
        WizardKind::Venue => run::<VenueDraft>(body, action),
    }
}

/// `POST /api/wizards/{kind}/advance`
pub async fn advance(Path(kind): Path<WizardKind>, Json(body): Json<StepBody>) -> Response {
    dispatch(kind, body, Move::Advance)
}

/// `POST /api/wizards/{kind}/back`
pub async fn back(Path(kind): Path<WizardKind>, Json(body): Json<StepBody>) -> Response {
    dispatch(kind, body, Move::Back)
}

/// `POST /api/wizards/{kind}/submit`: 204 when every step passes.
pub async fn submit(Path(kind): Path<WizardKind>, Json(body): Json<StepBody>) -> Response {
    dispatch(kind, body, Move::Submit)
}
