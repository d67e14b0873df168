use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionUser
// =============================================================================

fn user(role: Role) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "someone@example.com".into(),
        full_name: "Someone".into(),
        role,
        avatar_url: None,
        onboarding_completed: true,
    }
}

#[test]
fn admin_counts_as_owner() {
    assert!(user(Role::Admin).is_admin());
    assert!(user(Role::Admin).is_owner());
    assert!(user(Role::Owner).is_owner());
    assert!(!user(Role::Owner).is_admin());
    assert!(!user(Role::Player).is_owner());
}

#[test]
fn session_user_serializes_role_lowercase() {
    let json = serde_json::to_value(user(Role::Owner)).unwrap();
    assert_eq!(json["role"], "owner");
    assert_eq!(json["onboarding_completed"], true);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn live_session_round_trip() {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required for live-db-tests");
    let pool = crate::db::init_pool(&url, 2).await.expect("pool");
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO profiles (email, password_hash, full_name) VALUES ($1, 'x', 'Live') RETURNING id",
    )
    .bind(format!("live-{}@example.com", Uuid::new_v4()))
    .fetch_one(&pool)
    .await
    .expect("insert profile");

    let token = create_session(&pool, user_id).await.expect("session");
    let found = validate_session(&pool, &token).await.expect("validate").expect("user");
    assert_eq!(found.id, user_id);
    assert_eq!(found.role, Role::Player);

    delete_session(&pool, &token).await.expect("delete");
    assert!(validate_session(&pool, &token).await.expect("validate").is_none());
}
