//! Shared domain vocabulary: roles, statuses and the sport catalogue.
//!
//! Enums are stored as lowercase `TEXT` columns (with `CHECK` constraints in
//! the migration) and travel as lowercase JSON strings.

use serde::{Deserialize, Serialize};

/// Sports a venue can host or a game can be played as.
pub const SPORTS: &[&str] = &[
    "football",
    "cricket",
    "basketball",
    "badminton",
    "tennis",
    "table-tennis",
    "volleyball",
    "squash",
    "pickleball",
    "hockey",
    "swimming",
];

/// Amenities an owner can tick when listing a venue.
pub const AMENITIES: &[&str] = &[
    "parking",
    "changing-rooms",
    "showers",
    "floodlights",
    "drinking-water",
    "equipment-rental",
    "first-aid",
    "cafeteria",
    "wifi",
    "seating",
];

#[must_use]
pub fn is_known_sport(sport: &str) -> bool {
    SPORTS.contains(&sport)
}

#[must_use]
pub fn is_known_amenity(amenity: &str) -> bool {
    AMENITIES.contains(&amenity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    Player,
    Owner,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum GameStatus {
    Open,
    Full,
    Cancelled,
    Completed,
}

impl GameStatus {
    #[must_use]
    pub fn accepts_players(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentStatus {
    Free,
    Paid,
}
