//! Venue and game discovery: filtering and sorting of fetched read models.
//!
//! The database query narrows by the cheap, indexable predicates (active
//! venues, upcoming games); everything the browse pages let a user tweak is
//! applied here so one pure function defines the result order.

use std::cmp::Ordering;

use serde::Deserialize;
use time::Date;

use crate::domain::{GameStatus, SkillLevel};
use crate::geo::{self, Coordinate, Located};
use crate::services::game::GameSummary;
use crate::services::venue::VenueSummary;
use crate::timefmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VenueSort {
    #[default]
    Distance,
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameSort {
    Distance,
    #[default]
    Soonest,
    Fee,
}

/// Query-string filters for `GET /api/venues`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueQuery {
    pub sport: Option<String>,
    pub q: Option<String>,
    /// Bounds apply to the customer price.
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub sort: Option<VenueSort>,
}

/// Query-string filters for `GET /api/games`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameQuery {
    pub sport: Option<String>,
    pub q: Option<String>,
    pub skill_level: Option<SkillLevel>,
    /// `YYYY-MM-DD`; unparseable values are ignored.
    pub from: Option<String>,
    #[serde(default)]
    pub open_only: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    pub sort: Option<GameSort>,
}

fn origin(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    Coordinate::from_parts(lat, lng).filter(Coordinate::is_valid)
}

fn normalized_text(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}

fn matches_text(needle: &str, haystacks: &[&str]) -> bool {
    haystacks.iter().any(|h| h.to_lowercase().contains(needle))
}

fn matches_sport(wanted: Option<&str>, sports: &[String]) -> bool {
    match wanted.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        Some(sport) => sports.iter().any(|s| s.eq_ignore_ascii_case(sport)),
        None => true,
    }
}

// =============================================================================
// VENUES
// =============================================================================

impl Located for VenueSummary {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

/// Annotate distances, filter, and sort venues for a browse page.
#[must_use]
pub fn apply_venue_query(mut venues: Vec<VenueSummary>, query: &VenueQuery) -> Vec<VenueSummary> {
    let origin = origin(query.lat, query.lng);
    let text = normalized_text(query.q.as_deref());

    if let Some(origin) = origin {
        for venue in &mut venues {
            venue.distance_km = geo::distance_to(venue, origin);
        }
    }

    venues.retain(|v| {
        matches_sport(query.sport.as_deref(), &v.sports)
            && text
                .as_deref()
                .is_none_or(|t| matches_text(t, &[&v.name, &v.city, &v.address, &v.description]))
            && query.min_price.is_none_or(|min| v.customer_price >= min)
            && query.max_price.is_none_or(|max| v.customer_price <= max)
            && match (origin, query.radius_km) {
                (Some(origin), Some(radius)) => geo::within_radius(v, origin, radius),
                _ => true,
            }
    });

    match (query.sort.unwrap_or_default(), origin) {
        (VenueSort::Distance, Some(origin)) => geo::sort_by_distance(&mut venues, origin),
        (VenueSort::Distance | VenueSort::Newest, _) => venues.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        (VenueSort::PriceAsc, _) => venues.sort_by_key(|v| v.customer_price),
        (VenueSort::PriceDesc, _) => venues.sort_by_key(|v| std::cmp::Reverse(v.customer_price)),
        (VenueSort::Rating, _) => venues.sort_by(|a, b| compare_rating(b.avg_rating, a.avg_rating)),
    }
    venues
}

/// Unrated venues rank below every rated one.
fn compare_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// GAMES
// =============================================================================

impl Located for GameSummary {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

/// Annotate distances, filter, and sort games for the games page.
#[must_use]
pub fn apply_game_query(mut games: Vec<GameSummary>, query: &GameQuery) -> Vec<GameSummary> {
    let origin = origin(query.lat, query.lng);
    let text = normalized_text(query.q.as_deref());
    let from: Option<Date> = query.from.as_deref().and_then(timefmt::parse_date);

    if let Some(origin) = origin {
        for game in &mut games {
            game.distance_km = geo::distance_to(game, origin);
        }
    }

    games.retain(|g| {
        matches_sport(query.sport.as_deref(), std::slice::from_ref(&g.sport))
            && text
                .as_deref()
                .is_none_or(|t| matches_text(t, &[&g.title, &g.location, &g.description]))
            && skill_matches(query.skill_level, g.skill_level)
            && from.is_none_or(|from| g.game_date >= from)
            && (!query.open_only || (g.status == GameStatus::Open && g.spots_left() > 0))
            && match (origin, query.radius_km) {
                (Some(origin), Some(radius)) => geo::within_radius(g, origin, radius),
                _ => true,
            }
    });

    match query.sort.unwrap_or_default() {
        GameSort::Distance if origin.is_some() => {
            games.sort_by(|a, b| geo::compare_distance(a.distance_km, b.distance_km));
        }
        GameSort::Distance | GameSort::Soonest => games.sort_by_key(|g| (g.game_date, g.start_time)),
        GameSort::Fee => games.sort_by_key(|g| (g.fee_per_player, g.game_date, g.start_time)),
    }
    games
}

/// A game open to `Any` level matches every filter, and an `Any` filter matches every game.
#[must_use]
pub fn skill_matches(wanted: Option<SkillLevel>, game: SkillLevel) -> bool {
    match wanted {
        None | Some(SkillLevel::Any) => true,
        Some(level) => game == SkillLevel::Any || game == level,
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
