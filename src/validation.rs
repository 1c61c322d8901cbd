//! Checks for allocations an operator edited by hand before saving.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::region::RegionCatalog;
use crate::traits::Id;

/// One cab of an operator-submitted allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCab<RiderId> {
    pub cab_number: String,
    pub cab_type: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub pickup_region: String,
    pub passkey: String,
    pub riders: Vec<RiderId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError<RiderId> {
    MissingField { cab: usize, field: &'static str },
    UnknownPickupRegion { cab: usize, region: String },
    CabSize { cab: usize, riders: usize, capacity: u32 },
    DuplicateCabNumber(String),
    DuplicatePasskey(String),
    RiderInMultipleCabs(RiderId),
    RiderNotBooked(RiderId),
    UnassignedRiders(usize),
}

impl<R: fmt::Debug> fmt::Display for ValidationError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField { cab, field } => {
                write!(f, "cab #{} is missing {}", cab + 1, field)
            }
            ValidationError::UnknownPickupRegion { cab, region } => {
                write!(f, "cab #{} has unknown pickup region '{}'", cab + 1, region)
            }
            ValidationError::CabSize {
                cab,
                riders,
                capacity,
            } => write!(
                f,
                "cab #{} has {} riders, must have 1-{}",
                cab + 1,
                riders,
                capacity
            ),
            ValidationError::DuplicateCabNumber(number) => {
                write!(f, "duplicate cab number: {}", number)
            }
            ValidationError::DuplicatePasskey(passkey) => write!(f, "duplicate passkey: {}", passkey),
            ValidationError::RiderInMultipleCabs(rider) => {
                write!(f, "rider {:?} is assigned to multiple cabs", rider)
            }
            ValidationError::RiderNotBooked(rider) => {
                write!(f, "rider {:?} has no booking on this trip", rider)
            }
            ValidationError::UnassignedRiders(count) => {
                write!(f, "{} rider(s) are not assigned to any cab", count)
            }
        }
    }
}

impl<R: fmt::Debug> std::error::Error for ValidationError<R> {}

/// Validates a hand-edited allocation against the trip's booked riders.
///
/// Returns the first problem found, checking cabs in submission order.
pub fn validate_manual_allocation<R: Id>(
    cabs: &[ManualCab<R>],
    booked: &[R],
    capacity: u32,
    catalog: &RegionCatalog,
) -> Result<(), ValidationError<R>> {
    let booked_set: HashSet<&R> = booked.iter().collect();
    let mut cab_numbers: HashSet<&str> = HashSet::new();
    let mut passkeys: HashSet<&str> = HashSet::new();
    let mut assigned: HashSet<&R> = HashSet::new();

    for (index, cab) in cabs.iter().enumerate() {
        let required: [(&'static str, &String); 6] = [
            ("cab number", &cab.cab_number),
            ("cab type", &cab.cab_type),
            ("driver name", &cab.driver_name),
            ("driver phone", &cab.driver_phone),
            ("pickup region", &cab.pickup_region),
            ("passkey", &cab.passkey),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField {
                cab: index,
                field: *field,
            });
        }

        if catalog.index_of(&cab.pickup_region).is_err() {
            return Err(ValidationError::UnknownPickupRegion {
                cab: index,
                region: cab.pickup_region.clone(),
            });
        }

        if cab.riders.is_empty() || cab.riders.len() > capacity as usize {
            return Err(ValidationError::CabSize {
                cab: index,
                riders: cab.riders.len(),
                capacity,
            });
        }

        if !cab_numbers.insert(cab.cab_number.as_str()) {
            return Err(ValidationError::DuplicateCabNumber(cab.cab_number.clone()));
        }
        if !passkeys.insert(cab.passkey.as_str()) {
            return Err(ValidationError::DuplicatePasskey(cab.passkey.clone()));
        }

        for rider in &cab.riders {
            if !booked_set.contains(rider) {
                return Err(ValidationError::RiderNotBooked(rider.clone()));
            }
            if !assigned.insert(rider) {
                return Err(ValidationError::RiderInMultipleCabs(rider.clone()));
            }
        }
    }

    let unassigned = booked_set.difference(&assigned).count();
    if unassigned > 0 {
        return Err(ValidationError::UnassignedRiders(unassigned));
    }

    Ok(())
}
