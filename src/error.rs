//! Error types for the allocation core and its adapters.

use std::fmt;
use std::time::Duration;

/// Failures surfaced by aggregation, optimization, materialization and runs.
#[derive(Debug)]
pub enum AllocationError {
    /// Malformed demand, cost model or plan. Caller bug, never retried.
    InvalidInput(String),
    /// A booking names a region the catalog does not know.
    UnknownRegion(String),
    /// The optimizer found no plan. Cannot happen for valid input.
    NoFeasibleAllocation,
    /// The solver exceeded its wall-clock budget.
    SolverTimeout { budget: Duration },
    /// Rider lists and the plan disagree on a region's demand.
    DemandMismatch {
        region: usize,
        expected: u32,
        actual: u32,
    },
    /// Another run for the same trip is still in flight.
    RunInProgress(String),
    /// The booking source could not supply bookings.
    Source(BookingSourceError),
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationError::InvalidInput(reason) => write!(f, "invalid input: {}", reason),
            AllocationError::UnknownRegion(region) => write!(f, "unknown region '{}'", region),
            AllocationError::NoFeasibleAllocation => write!(f, "no feasible allocation found"),
            AllocationError::SolverTimeout { budget } => {
                write!(f, "solver exceeded its time budget of {:?}", budget)
            }
            AllocationError::DemandMismatch {
                region,
                expected,
                actual,
            } => write!(
                f,
                "region {} has {} riders but the plan expects {}",
                region, actual, expected
            ),
            AllocationError::RunInProgress(trip) => {
                write!(f, "an allocation run for trip '{}' is already in progress", trip)
            }
            AllocationError::Source(err) => write!(f, "booking source failed: {}", err),
        }
    }
}

impl std::error::Error for AllocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AllocationError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BookingSourceError> for AllocationError {
    fn from(err: BookingSourceError) -> Self {
        AllocationError::Source(err)
    }
}

#[derive(Debug)]
pub enum BookingSourceError {
    Http(reqwest::Error),
    UnknownTrip(String),
}

impl fmt::Display for BookingSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingSourceError::Http(err) => write!(f, "http error: {}", err),
            BookingSourceError::UnknownTrip(trip) => write!(f, "trip '{}' not found", trip),
        }
    }
}

impl std::error::Error for BookingSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookingSourceError::Http(err) => Some(err),
            BookingSourceError::UnknownTrip(_) => None,
        }
    }
}

impl From<reqwest::Error> for BookingSourceError {
    fn from(err: reqwest::Error) -> Self {
        BookingSourceError::Http(err)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot read config: {}", err),
            ConfigError::Parse(err) => write!(f, "cannot parse config: {}", err),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}
