//! Test fixtures for cab-planner.
//!
//! Provides:
//! - Booking builders and demand-shaped booking sets
//! - In-memory booking sources, including one that can hold a run in flight
//! - The deployed weekly scenario
//! - Deterministic demand samples

pub mod bookings;
pub mod demands;

pub use bookings::*;
pub use demands::*;
