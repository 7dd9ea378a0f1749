//! Domain models for the clinic admin dashboard.

mod patient;
mod review;

pub use patient::*;
pub use review::*;
