//! cab-planner core
//!
//! Allocates a fleet of fixed-capacity cabs to riders booked from ordered
//! pickup regions, and assigns every rider a vehicle and seat.

pub mod traits;
pub mod error;
pub mod region;
pub mod demand;
pub mod solver;
pub mod materialize;
pub mod validation;
pub mod store;
pub mod booking_source;
pub mod config;
