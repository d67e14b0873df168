//! Page routing table and access guards.
//!
//! ARCHITECTURE
//! ============
//! Every browser path the marketplace serves is listed once in [`PAGES`]
//! with the page it renders and who may see it. [`resolve`] decides, for a
//! path and the current viewer, whether to render, redirect, or 404:
//!
//! 1. Fixed redirects (`/discover`, `/settings`, `/dashboard`).
//! 2. Table match, with `:param` segments captured.
//! 3. Guest-only pages send signed-in viewers to their dashboard.
//! 4. Protected pages send anonymous viewers to `/login?redirect=<path>`.
//! 5. Signed-in viewers that have not finished onboarding are sent to the
//!    onboarding wizard for their role.
//! 6. Owner and admin pages send everyone else to `/`.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::domain::Role;
use crate::services::session::SessionUser;

/// Who may open a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    /// Login and signup screens; signed-in viewers skip them.
    Guest,
    Authenticated,
    /// Venue owners and admins.
    Owner,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    Venues,
    VenueDetail,
    Games,
    GameDetail,
    PublicProfile,
    About,
    HowItWorks,
    ListYourVenue,
    Contact,
    Faq,
    Terms,
    Privacy,
    PaymentCancelled,
    Login,
    MfaVerify,
    Signup,
    ForgotPassword,
    ResetPassword,
    PlayerOnboarding,
    OwnerOnboarding,
    PlayerDashboard,
    Profile,
    Security,
    MyBookings,
    BookingDetail,
    BookVenue,
    BookingSuccess,
    MyGames,
    CreateGame,
    GamePaymentSuccess,
    Notifications,
    Favorites,
    OwnerDashboard,
    OwnerVenues,
    OwnerVenueNew,
    OwnerVenueEdit,
    OwnerAvailability,
    OwnerBookings,
    OwnerEarnings,
    AdminDashboard,
    AdminUsers,
    AdminVenues,
    AdminBookings,
    AdminGames,
    NotFound,
}

pub struct PageRoute {
    pub pattern: &'static str,
    pub page: Page,
    pub access: Access,
}

const fn route(pattern: &'static str, page: Page, access: Access) -> PageRoute {
    PageRoute { pattern, page, access }
}

pub static PAGES: &[PageRoute] = &[
    route("/", Page::Home, Access::Public),
    route("/venues", Page::Venues, Access::Public),
    route("/venues/:id", Page::VenueDetail, Access::Public),
    route("/games", Page::Games, Access::Public),
    route("/games/:id", Page::GameDetail, Access::Public),
    route("/users/:id", Page::PublicProfile, Access::Public),
    route("/about", Page::About, Access::Public),
    route("/how-it-works", Page::HowItWorks, Access::Public),
    route("/list-your-venue", Page::ListYourVenue, Access::Public),
    route("/contact", Page::Contact, Access::Public),
    route("/faq", Page::Faq, Access::Public),
    route("/terms", Page::Terms, Access::Public),
    route("/privacy", Page::Privacy, Access::Public),
    route("/payment-cancelled", Page::PaymentCancelled, Access::Public),
    route("/login", Page::Login, Access::Guest),
    route("/login/verify", Page::MfaVerify, Access::Guest),
    route("/signup", Page::Signup, Access::Guest),
    route("/forgot-password", Page::ForgotPassword, Access::Guest),
    route("/reset-password", Page::ResetPassword, Access::Guest),
    route("/onboarding/player", Page::PlayerOnboarding, Access::Authenticated),
    route("/onboarding/owner", Page::OwnerOnboarding, Access::Authenticated),
    route("/player/dashboard", Page::PlayerDashboard, Access::Authenticated),
    route("/profile", Page::Profile, Access::Authenticated),
    route("/security", Page::Security, Access::Authenticated),
    route("/bookings", Page::MyBookings, Access::Authenticated),
    route("/bookings/:id", Page::BookingDetail, Access::Authenticated),
    route("/venues/:id/book", Page::BookVenue, Access::Authenticated),
    route("/booking-success", Page::BookingSuccess, Access::Authenticated),
    route("/my-games", Page::MyGames, Access::Authenticated),
    route("/games/new", Page::CreateGame, Access::Authenticated),
    route("/game-payment-success", Page::GamePaymentSuccess, Access::Authenticated),
    route("/notifications", Page::Notifications, Access::Authenticated),
    route("/favorites", Page::Favorites, Access::Authenticated),
    route("/owner/dashboard", Page::OwnerDashboard, Access::Owner),
    route("/owner/venues", Page::OwnerVenues, Access::Owner),
    route("/owner/venues/new", Page::OwnerVenueNew, Access::Owner),
    route("/owner/venues/:id/edit", Page::OwnerVenueEdit, Access::Owner),
    route("/owner/venues/:id/availability", Page::OwnerAvailability, Access::Owner),
    route("/owner/bookings", Page::OwnerBookings, Access::Owner),
    route("/owner/earnings", Page::OwnerEarnings, Access::Owner),
    route("/admin", Page::AdminDashboard, Access::Admin),
    route("/admin/users", Page::AdminUsers, Access::Admin),
    route("/admin/venues", Page::AdminVenues, Access::Admin),
    route("/admin/bookings", Page::AdminBookings, Access::Admin),
    route("/admin/games", Page::AdminGames, Access::Admin),
];

const REDIRECTS: &[(&str, &str)] = &[("/discover", "/venues"), ("/settings", "/profile")];

/// The parts of a session that guards look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub role: Role,
    pub onboarding_completed: bool,
}

impl From<&SessionUser> for Viewer {
    fn from(user: &SessionUser) -> Self {
        Self { role: user.role, onboarding_completed: user.onboarding_completed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Render { page: Page, params: BTreeMap<String, String> },
    Redirect { to: String },
    NotFound { page: Page },
}

impl Resolution {
    fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect { to: to.into() }
    }
}

#[must_use]
pub fn dashboard_for(role: Role) -> &'static str {
    match role {
        Role::Player => "/player/dashboard",
        Role::Owner => "/owner/dashboard",
        Role::Admin => "/admin",
    }
}

#[must_use]
pub fn onboarding_for(role: Role) -> Option<&'static str> {
    match role {
        Role::Player => Some("/onboarding/player"),
        Role::Owner => Some("/onboarding/owner"),
        Role::Admin => None,
    }
}

/// Drop the query string and any trailing slash; `/` stays `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() }
}

/// Percent-encode everything outside the unreserved set and `/`.
#[must_use]
pub fn encode_redirect(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for b in path.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~' | b'/') {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut want = pattern.split('/').filter(|s| !s.is_empty());
    let mut have = path.split('/').filter(|s| !s.is_empty());
    let mut params = BTreeMap::new();
    loop {
        match (want.next(), have.next()) {
            (None, None) => return Some(params),
            (Some(w), Some(h)) => {
                if let Some(name) = w.strip_prefix(':') {
                    params.insert(name.to_owned(), h.to_owned());
                } else if w != h {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

/// First table entry matching `path`. Literal segments win over `:param`
/// segments, so `/games/new` is not read as a game id.
#[must_use]
pub fn match_route(path: &str) -> Option<(&'static PageRoute, BTreeMap<String, String>)> {
    let literal = PAGES
        .iter()
        .filter(|r| !r.pattern.contains(':'))
        .find_map(|r| match_pattern(r.pattern, path).map(|p| (r, p)));
    literal.or_else(|| {
        PAGES
            .iter()
            .filter(|r| r.pattern.contains(':'))
            .find_map(|r| match_pattern(r.pattern, path).map(|p| (r, p)))
    })
}

/// Decide what the browser should see at `path`.
#[must_use]
pub fn resolve(path: &str, viewer: Option<Viewer>) -> Resolution {
    let path = normalize_path(path);

    if let Some((_, to)) = REDIRECTS.iter().find(|(from, _)| *from == path) {
        return Resolution::redirect(*to);
    }
    if path == "/dashboard" {
        return match viewer {
            Some(v) => Resolution::redirect(dashboard_for(v.role)),
            None => Resolution::redirect(format!("/login?redirect={}", encode_redirect(&path))),
        };
    }

    let Some((route, params)) = match_route(&path) else {
        return Resolution::NotFound { page: Page::NotFound };
    };

    match (route.access, viewer) {
        (Access::Public, _) | (Access::Guest, None) => {}
        (Access::Guest, Some(v)) => return Resolution::redirect(dashboard_for(v.role)),
        (_, None) => return Resolution::redirect(format!("/login?redirect={}", encode_redirect(&path))),
        (access, Some(v)) => {
            if !v.onboarding_completed
                && let Some(onboarding) = onboarding_for(v.role)
                && path != onboarding
            {
                return Resolution::redirect(onboarding);
            }
            let allowed = match access {
                Access::Owner => matches!(v.role, Role::Owner | Role::Admin),
                Access::Admin => v.role == Role::Admin,
                _ => true,
            };
            if !allowed {
                return Resolution::redirect("/");
            }
        }
    }

    Resolution::Render { page: route.page, params }
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
