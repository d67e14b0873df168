//! Great-circle distance helpers for venue and game discovery.
//!
//! Records expose optional coordinates through [`Located`]; anything without
//! a full latitude/longitude pair is treated as "unknown distance" and sorts
//! after every located record.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Build a coordinate from a nullable column pair.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self { latitude, longitude }),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Anything that may have a position on the map.
pub trait Located {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl Located for Coordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

/// Haversine distance between two points in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Distance from `origin` to the record, if the record is located.
#[must_use]
pub fn distance_to<T: Located>(item: &T, origin: Coordinate) -> Option<f64> {
    item.coordinate().map(|c| haversine_km(origin, c))
}

/// Stable ascending sort by distance; unlocated records go last in input order.
pub fn sort_by_distance<T: Located>(items: &mut [T], origin: Coordinate) {
    items.sort_by(|a, b| compare_distance(distance_to(a, origin), distance_to(b, origin)));
}

/// Ordering for optional distances with `None` after every `Some`.
#[must_use]
pub fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Whether the record lies within `radius_km` of `origin`. Unlocated records never match.
#[must_use]
pub fn within_radius<T: Located>(item: &T, origin: Coordinate, radius_km: f64) -> bool {
    distance_to(item, origin).is_some_and(|d| d <= radius_km)
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
