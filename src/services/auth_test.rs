use super::*;

// =============================================================================
// PASSWORDS
// =============================================================================

#[test]
fn password_hash_round_trips() {
    let stored = hash_password("correct horse").unwrap();
    assert!(stored.starts_with("pbkdf2-sha256$100000$"));
    assert!(verify_password("correct horse", &stored).unwrap());
    assert!(!verify_password("wrong horse", &stored).unwrap());
}

#[test]
fn password_hash_is_salted() {
    assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
}

#[test]
fn malformed_hash_is_rejected() {
    for bad in ["", "plain", "bcrypt$10$aa$bb", "pbkdf2-sha256$x$aa$bb", "pbkdf2-sha256$10$zz$bb", "pbkdf2-sha256$0$aa$bb"] {
        assert!(matches!(verify_password("pw", bad), Err(AuthError::MalformedHash)), "{bad:?}");
    }
}

#[test]
fn hex_to_bytes_parses_pairs() {
    assert_eq!(hex_to_bytes("00ff10"), Some(vec![0x00, 0xff, 0x10]));
    assert_eq!(hex_to_bytes("abc"), None);
    assert_eq!(hex_to_bytes("gg"), None);
}

// =============================================================================
// MFA CODES
// =============================================================================

#[test]
fn generate_code_shape() {
    let code = generate_code();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|c| CODE_ALPHABET.contains(&c)));
}

#[test]
fn normalize_code_uppercases() {
    assert_eq!(normalize_code(" abc234 "), Some("ABC234".to_owned()));
    let code = generate_code();
    assert_eq!(normalize_code(&code), Some(code.clone()));
}

#[test]
fn normalize_code_rejects_bad_shapes() {
    assert_eq!(normalize_code("abc23"), None);
    assert_eq!(normalize_code("abc2345"), None);
    // 0, 1, I and O are excluded from the alphabet.
    assert_eq!(normalize_code("ABC10O"), None);
}

#[test]
fn hash_code_is_stable() {
    assert_eq!(hash_code("ABC234"), hash_code("ABC234"));
    assert_ne!(hash_code("ABC234"), hash_code("ABC235"));
    assert_eq!(hash_code("ABC234").len(), 64);
}

#[test]
fn code_email_injects_name_and_code() {
    let html = render_code_email("Asha", "XYZ789");
    assert!(html.contains("Asha"));
    assert!(html.contains("XYZ789"));
    assert!(!html.contains("{{"));
}

#[tokio::test]
async fn deliver_code_without_mail_config_is_noop() {
    assert!(deliver_code(None, "a@example.com", "A", "ABC234").await.is_ok());
}

// =============================================================================
// SIGNUP GATING
// =============================================================================

fn signup_form() -> SignupForm {
    SignupForm {
        email: "new@example.com".into(),
        password: "longenough".into(),
        confirm_password: "longenough".into(),
        full_name: "New Player".into(),
        role: crate::domain::Role::Player,
        phone: None,
    }
}

#[tokio::test]
async fn signup_with_mismatched_passwords_writes_nothing() {
    // Lazy pool: any query would fail with a connection error, not Invalid.
    let state = crate::state::test_helpers::test_app_state();
    let mut form = signup_form();
    form.confirm_password = "different1".into();

    match signup(&state.pool, &form).await {
        Err(AuthError::Invalid(errors)) => {
            assert_eq!(errors.get("confirm_password"), Some("Passwords do not match"));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn signup_with_short_password_and_bad_email_reports_both() {
    let state = crate::state::test_helpers::test_app_state();
    let mut form = signup_form();
    form.email = "not-an-email".into();
    form.password = "short".into();
    form.confirm_password = "short".into();

    let Err(AuthError::Invalid(errors)) = signup(&state.pool, &form).await else {
        panic!("expected Invalid");
    };
    assert!(errors.get("email").is_some());
    assert!(errors.get("password").is_some());
    assert!(errors.get("confirm_password").is_none());
}

#[tokio::test]
async fn malformed_mfa_code_is_rejected_before_db() {
    let state = crate::state::test_helpers::test_app_state();
    let err = verify_mfa(&state.pool, Uuid::new_v4(), "??").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn malformed_login_email_is_invalid_credentials() {
    let state = crate::state::test_helpers::test_app_state();
    let err = login(&state.pool, "nobody", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}
