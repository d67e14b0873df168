use time::macros::datetime;

use super::*;
use crate::domain::Role;

fn user(role: Role) -> SessionUser {
    SessionUser {
        id: Uuid::new_v4(),
        email: "u@example.com".into(),
        full_name: "U".into(),
        role,
        avatar_url: None,
        onboarding_completed: true,
    }
}

fn venue(price_per_hour: i64) -> VenueSummary {
    VenueSummary {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Turf Arena".into(),
        description: "Five-a-side turf".into(),
        address: "12 MG Road".into(),
        city: "Bengaluru".into(),
        latitude: Some(12.97),
        longitude: Some(77.59),
        price_per_hour,
        sports: vec!["football".into()],
        amenities: vec!["parking".into()],
        image_urls: Vec::new(),
        is_active: true,
        created_at: datetime!(2024-05-01 10:00 UTC),
        avg_rating: Some(4.5),
        review_count: 2,
        customer_price: 0,
        price_label: String::new(),
        distance_km: None,
    }
}

// =============================================================================
// can_manage
// =============================================================================

#[test]
fn owner_manages_own_venue_only() {
    let owner = user(Role::Owner);
    assert!(can_manage(owner.id, &owner));
    assert!(!can_manage(Uuid::new_v4(), &owner));
}

#[test]
fn admin_manages_any_venue() {
    assert!(can_manage(Uuid::new_v4(), &user(Role::Admin)));
}

#[test]
fn player_never_manages() {
    let player = user(Role::Player);
    assert!(!can_manage(player.id, &player));
}

// =============================================================================
// pricing
// =============================================================================

#[test]
fn priced_adds_service_fee_and_label() {
    let v = venue(1000).priced(&PricingConfig::default());
    assert_eq!(v.customer_price, 1050);
    assert_eq!(v.price_label, "₹1,050");
    assert_eq!(v.price_per_hour, 1000);
}

#[test]
fn priced_rounds_up() {
    let v = venue(999).priced(&PricingConfig { currency_symbol: "$".into(), service_fee_percent: 5 });
    assert_eq!(v.customer_price, 1049);
    assert_eq!(v.price_label, "$1,049");
}

#[test]
fn detail_flattens_summary() {
    let detail = VenueDetail {
        venue: venue(500).priced(&PricingConfig::default()),
        owner_name: "Owner".into(),
        hours: crate::availability::default_week(),
    };
    let json = serde_json::to_value(detail).unwrap();
    assert_eq!(json["name"], "Turf Arena");
    assert_eq!(json["customer_price"], 525);
    assert_eq!(json["owner_name"], "Owner");
    assert_eq!(json["hours"].as_array().unwrap().len(), 7);
    assert_eq!(json["hours"][0]["open_time"], "08:00");
}

// =============================================================================
// gating before writes
// =============================================================================

#[tokio::test]
async fn player_cannot_create_venue() {
    let state = crate::state::test_helpers::test_app_state();
    let err = create(&state.pool, &user(Role::Player), &VenueDraft::default(), &PricingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VenueError::Forbidden));
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_insert() {
    let state = crate::state::test_helpers::test_app_state();
    let err = create(&state.pool, &user(Role::Owner), &VenueDraft::default(), &PricingConfig::default())
        .await
        .unwrap_err();
    let VenueError::Invalid(errors) = err else { panic!("expected Invalid") };
    assert!(errors.get("name").is_some());
    assert!(errors.get("price_per_hour").is_some());
}
