use super::*;
use crate::validation::FieldErrors;

// =============================================================================
// env_bool — unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on"].iter().enumerate() {
        let key = format!("__TEST_SB_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__TEST_SB_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_case_and_whitespace() {
    let key = "__TEST_SB_EB_CI_417__";
    unsafe { std::env::set_var(key, "  On ") };
    assert_eq!(env_bool(key), Some(true));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__TEST_SB_EB_INVALID_5120__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__TEST_SB_EB_SURELY_UNSET_88__"), None);
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_is_http_only_and_lax() {
    let cookie = session_cookie("tok".into(), true);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.max_age(), Some(Duration::days(SESSION_DAYS)));
}

#[test]
fn expired_cookie_clears_value() {
    let cookie = expired_session_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.secure(), Some(false));
}

// =============================================================================
// auth_error_to_status
// =============================================================================

#[test]
fn auth_errors_map_to_statuses() {
    assert_eq!(auth_error_to_status(&AuthError::Invalid(FieldErrors::new())), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(auth_error_to_status(&AuthError::EmailTaken), StatusCode::CONFLICT);
    assert_eq!(auth_error_to_status(&AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::VerificationFailed), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::InvalidCode), StatusCode::BAD_REQUEST);
    assert_eq!(auth_error_to_status(&AuthError::MalformedHash), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn invalid_signup_renders_field_errors() {
    let mut errors = FieldErrors::new();
    errors.add("email", "Invalid email address");
    let resp = auth_error_response(AuthError::Invalid(errors));
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn login_response_is_tagged_by_step() {
    let challenge_id = Uuid::nil();
    let json = serde_json::to_value(LoginResponse::MfaRequired { challenge_id }).unwrap();
    assert_eq!(json["step"], "mfa_required");
    assert_eq!(json["challenge_id"], challenge_id.to_string());
}
