use super::*;

fn viewer(role: Role) -> Option<Viewer> {
    Some(Viewer { role, onboarding_completed: true })
}

fn redirect(to: &str) -> Resolution {
    Resolution::Redirect { to: to.to_owned() }
}

fn renders(resolution: &Resolution, page: Page) -> bool {
    matches!(resolution, Resolution::Render { page: p, .. } if *p == page)
}

// =============================================================================
// TABLE
// =============================================================================

#[test]
fn table_has_about_forty_unique_paths() {
    assert!(PAGES.len() >= 40);
    for (i, a) in PAGES.iter().enumerate() {
        assert!(PAGES[i + 1..].iter().all(|b| b.pattern != a.pattern), "duplicate {}", a.pattern);
    }
}

#[test]
fn literal_segments_beat_params() {
    let (route, params) = match_route("/games/new").unwrap();
    assert_eq!(route.page, Page::CreateGame);
    assert!(params.is_empty());

    let (route, params) = match_route("/games/abc").unwrap();
    assert_eq!(route.page, Page::GameDetail);
    assert_eq!(params.get("id").map(String::as_str), Some("abc"));
}

#[test]
fn nested_params_are_captured() {
    let (route, params) = match_route("/owner/venues/v1/availability").unwrap();
    assert_eq!(route.page, Page::OwnerAvailability);
    assert_eq!(params.get("id").map(String::as_str), Some("v1"));
}

#[test]
fn normalize_strips_query_and_trailing_slash() {
    assert_eq!(normalize_path("/venues/?sport=football"), "/venues");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/games#top"), "/games");
}

#[test]
fn encode_redirect_escapes_reserved() {
    assert_eq!(encode_redirect("/bookings/1"), "/bookings/1");
    assert_eq!(encode_redirect("/a b&c"), "/a%20b%26c");
}

// =============================================================================
// REDIRECTS
// =============================================================================

#[test]
fn fixed_redirects() {
    assert_eq!(resolve("/discover", None), redirect("/venues"));
    assert_eq!(resolve("/settings", viewer(Role::Player)), redirect("/profile"));
}

#[test]
fn dashboard_follows_role() {
    assert_eq!(resolve("/dashboard", viewer(Role::Player)), redirect("/player/dashboard"));
    assert_eq!(resolve("/dashboard", viewer(Role::Owner)), redirect("/owner/dashboard"));
    assert_eq!(resolve("/dashboard", viewer(Role::Admin)), redirect("/admin"));
    assert_eq!(resolve("/dashboard", None), redirect("/login?redirect=/dashboard"));
}

// =============================================================================
// GUARDS
// =============================================================================

#[test]
fn public_pages_render_for_anyone() {
    assert!(renders(&resolve("/", None), Page::Home));
    assert!(renders(&resolve("/venues", None), Page::Venues));
    assert!(renders(&resolve("/venues/123", viewer(Role::Owner)), Page::VenueDetail));
}

#[test]
fn unauthenticated_protected_path_goes_to_login() {
    assert_eq!(resolve("/bookings", None), redirect("/login?redirect=/bookings"));
    assert_eq!(resolve("/owner/venues/new", None), redirect("/login?redirect=/owner/venues/new"));
    assert_eq!(resolve("/admin", None), redirect("/login?redirect=/admin"));
}

#[test]
fn non_admin_is_sent_away_from_admin() {
    assert_eq!(resolve("/admin", viewer(Role::Player)), redirect("/"));
    assert_eq!(resolve("/admin/users", viewer(Role::Owner)), redirect("/"));
    assert!(renders(&resolve("/admin/users", viewer(Role::Admin)), Page::AdminUsers));
}

#[test]
fn owner_pages_need_owner_or_admin() {
    assert_eq!(resolve("/owner/dashboard", viewer(Role::Player)), redirect("/"));
    assert!(renders(&resolve("/owner/dashboard", viewer(Role::Owner)), Page::OwnerDashboard));
    assert!(renders(&resolve("/owner/bookings", viewer(Role::Admin)), Page::OwnerBookings));
}

#[test]
fn guest_pages_skip_to_dashboard_when_signed_in() {
    assert!(renders(&resolve("/login", None), Page::Login));
    assert_eq!(resolve("/login", viewer(Role::Owner)), redirect("/owner/dashboard"));
    assert_eq!(resolve("/signup", viewer(Role::Player)), redirect("/player/dashboard"));
}

#[test]
fn unfinished_onboarding_redirects_protected_pages() {
    let fresh = Some(Viewer { role: Role::Player, onboarding_completed: false });
    assert_eq!(resolve("/bookings", fresh), redirect("/onboarding/player"));
    assert!(renders(&resolve("/onboarding/player", fresh), Page::PlayerOnboarding));
    // Public pages stay reachable.
    assert!(renders(&resolve("/venues", fresh), Page::Venues));

    let fresh_owner = Some(Viewer { role: Role::Owner, onboarding_completed: false });
    assert_eq!(resolve("/owner/venues", fresh_owner), redirect("/onboarding/owner"));
}

#[test]
fn admins_are_never_sent_to_onboarding() {
    let admin = Some(Viewer { role: Role::Admin, onboarding_completed: false });
    assert!(renders(&resolve("/admin", admin), Page::AdminDashboard));
}

#[test]
fn unknown_path_is_not_found() {
    assert_eq!(resolve("/nope", None), Resolution::NotFound { page: Page::NotFound });
    assert_eq!(resolve("/venues/1/2/3", viewer(Role::Player)), Resolution::NotFound { page: Page::NotFound });
}

#[test]
fn resolution_serializes_with_kind_tag() {
    let json = serde_json::to_value(resolve("/games/g1", None)).unwrap();
    assert_eq!(json["kind"], "render");
    assert_eq!(json["page"], "game_detail");
    assert_eq!(json["params"]["id"], "g1");

    let json = serde_json::to_value(resolve("/discover", None)).unwrap();
    assert_eq!(json, serde_json::json!({ "kind": "redirect", "to": "/venues" }));
}
