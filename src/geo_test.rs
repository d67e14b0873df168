use super::*;

const MUMBAI: Coordinate = Coordinate { latitude: 19.0760, longitude: 72.8777 };
const DELHI: Coordinate = Coordinate { latitude: 28.7041, longitude: 77.1025 };
const LONDON: Coordinate = Coordinate { latitude: 51.5074, longitude: -0.1278 };
const PARIS: Coordinate = Coordinate { latitude: 48.8566, longitude: 2.3522 };

#[derive(Debug, Clone)]
struct Place {
    name: &'static str,
    at: Option<Coordinate>,
}

impl Located for Place {
    fn coordinate(&self) -> Option<Coordinate> {
        self.at
    }
}

#[test]
fn distance_to_self_is_zero() {
    assert!(haversine_km(MUMBAI, MUMBAI).abs() < 1e-9);
    assert!(haversine_km(LONDON, LONDON).abs() < 1e-9);
}

#[test]
fn distance_is_symmetric() {
    let ab = haversine_km(MUMBAI, DELHI);
    let ba = haversine_km(DELHI, MUMBAI);
    assert!((ab - ba).abs() < 1e-9);
}

#[test]
fn known_city_pairs_within_tolerance() {
    let london_paris = haversine_km(LONDON, PARIS);
    assert!((london_paris - 343.5).abs() < 5.0, "london-paris was {london_paris}");

    let mumbai_delhi = haversine_km(MUMBAI, DELHI);
    assert!((mumbai_delhi - 1153.0).abs() < 15.0, "mumbai-delhi was {mumbai_delhi}");
}

#[test]
fn antipodal_points_are_half_circumference() {
    let a = Coordinate::new(0.0, 0.0);
    let b = Coordinate::new(0.0, 180.0);
    let expected = std::f64::consts::PI * EARTH_RADIUS_KM;
    assert!((haversine_km(a, b) - expected).abs() < 1e-6);
}

#[test]
fn sort_by_distance_puts_unlocated_last() {
    let mut places = vec![
        Place { name: "nowhere-1", at: None },
        Place { name: "delhi", at: Some(DELHI) },
        Place { name: "mumbai", at: Some(MUMBAI) },
        Place { name: "nowhere-2", at: None },
    ];
    sort_by_distance(&mut places, Coordinate::new(19.0, 72.8));

    let names: Vec<_> = places.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["mumbai", "delhi", "nowhere-1", "nowhere-2"]);
}

#[test]
fn within_radius_excludes_unlocated() {
    let origin = MUMBAI;
    assert!(within_radius(&Place { name: "here", at: Some(MUMBAI) }, origin, 1.0));
    assert!(!within_radius(&Place { name: "far", at: Some(DELHI) }, origin, 100.0));
    assert!(!within_radius(&Place { name: "none", at: None }, origin, 10_000.0));
}

#[test]
fn from_parts_requires_both_components() {
    assert!(Coordinate::from_parts(Some(1.0), None).is_none());
    assert!(Coordinate::from_parts(None, Some(1.0)).is_none());
    assert_eq!(Coordinate::from_parts(Some(1.0), Some(2.0)), Some(Coordinate::new(1.0, 2.0)));
}

#[test]
fn is_valid_checks_ranges() {
    assert!(MUMBAI.is_valid());
    assert!(!Coordinate::new(91.0, 0.0).is_valid());
    assert!(!Coordinate::new(0.0, -181.0).is_valid());
}
