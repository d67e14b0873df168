//! Domain services. Each module owns its SQL and a `thiserror` error enum;
//! routes translate those errors into HTTP status codes.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod game;
pub mod hours;
pub mod profile;
pub mod review;
pub mod session;
pub mod venue;
