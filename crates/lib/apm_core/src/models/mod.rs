//! Wire models exchanged with the AccessPointMap backend.

pub mod access_point;
pub mod auth;
