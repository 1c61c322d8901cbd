//! Turns an allocation plan into per-rider vehicle and seat assignments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::demand::{RidersByRegion, rider_count};
use crate::error::AllocationError;
use crate::region::RegionCatalog;
use crate::solver::AllocationPlan;
use crate::traits::Booking;

/// Seat labels of the seven-seat cabs, front to back.
const SEVEN_SEATER_LABELS: [&str; 7] = ["F1", "M1", "M2", "M3", "B1", "B2", "B3"];

/// A vehicle slot in a plan: the `ordinal`-th vehicle (1-based) stationed
/// at region `station`. The vehicle registry binds slots to hired cabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId {
    pub station: usize,
    pub ordinal: u32,
}

impl VehicleId {
    /// Human-readable label such as `HJB-2`.
    pub fn label(&self, catalog: &RegionCatalog) -> String {
        match catalog.code(self.station) {
            Some(code) => format!("{}-{}", code, self.ordinal),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.station, self.ordinal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderAssignment<RiderId, TripId> {
    pub rider_id: RiderId,
    pub trip_id: TripId,
    pub origin_region: usize,
    pub vehicle: VehicleId,
    /// 1-based seat position within the vehicle.
    pub seat_position: u32,
}

/// Seat label for a position in a vehicle of `capacity` seats.
///
/// Only the seven-seat layout has labels.
pub fn seat_label(seat_position: u32, capacity: u32) -> Option<&'static str> {
    if capacity as usize != SEVEN_SEATER_LABELS.len() || seat_position == 0 {
        return None;
    }
    SEVEN_SEATER_LABELS.get(seat_position as usize - 1).copied()
}

/// Assigns every rider a vehicle and seat that realize `plan`'s flow.
///
/// For each origin region, then each station, the next `flow[i][j]` riders of
/// region `i` (in booking order) board at station `j`. Vehicles at a station
/// fill in ordinal order and seats are packed densely from 1.
pub fn materialize_assignments<B: Booking>(
    plan: &AllocationPlan,
    riders: &RidersByRegion<'_, B>,
) -> Result<Vec<RiderAssignment<B::RiderId, B::TripId>>, AllocationError> {
    plan.check_invariants()?;

    let planned = plan.demand();
    for region in 0..plan.regions().max(riders.len()) {
        let expected = planned.get(region);
        let actual = rider_count(region, riders.region(region).len())?;
        if expected != actual {
            return Err(AllocationError::DemandMismatch {
                region,
                expected,
                actual,
            });
        }
    }

    let capacity = plan.capacity;
    let mut boarded = vec![0u32; plan.regions()];
    let mut assignments = Vec::with_capacity(planned.total() as usize);

    for (origin, row) in plan.flow.iter().enumerate() {
        let mut queue = riders.region(origin).iter();
        for (station, &count) in row.iter().enumerate() {
            for booking in queue.by_ref().take(count as usize) {
                let slot = boarded[station];
                boarded[station] += 1;
                assignments.push(RiderAssignment {
                    rider_id: booking.rider_id().clone(),
                    trip_id: booking.trip_id().clone(),
                    origin_region: origin,
                    vehicle: VehicleId {
                        station,
                        ordinal: slot / capacity + 1,
                    },
                    seat_position: slot % capacity + 1,
                });
            }
        }
    }

    debug!(
        riders = assignments.len(),
        vehicles = plan.total_vehicles(),
        "materialized rider assignments"
    );

    Ok(assignments)
}

/// Groups assignments by vehicle, in vehicle order.
pub fn group_by_vehicle<R, T>(
    assignments: &[RiderAssignment<R, T>],
) -> BTreeMap<VehicleId, Vec<&RiderAssignment<R, T>>> {
    let mut vehicles: BTreeMap<VehicleId, Vec<&RiderAssignment<R, T>>> = BTreeMap::new();
    for assignment in assignments {
        vehicles.entry(assignment.vehicle).or_default().push(assignment);
    }
    for riders in vehicles.values_mut() {
        riders.sort_by_key(|assignment| assignment.seat_position);
    }
    vehicles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_labels() {
        assert_eq!(seat_label(1, 7), Some("F1"));
        assert_eq!(seat_label(4, 7), Some("M3"));
        assert_eq!(seat_label(7, 7), Some("B3"));
        assert_eq!(seat_label(8, 7), None);
        assert_eq!(seat_label(0, 7), None);
        assert_eq!(seat_label(1, 4), None);
    }

    #[test]
    fn test_vehicle_label() {
        let catalog = RegionCatalog::deployed();
        let vehicle = VehicleId {
            station: 3,
            ordinal: 2,
        };
        assert_eq!(vehicle.label(&catalog), "HJB-2");
        assert_eq!(vehicle.to_string(), "3-2");
    }

    #[test]
    fn test_vehicle_order() {
        let a = VehicleId {
            station: 0,
            ordinal: 2,
        };
        let b = VehicleId {
            station: 1,
            ordinal: 1,
        };
        assert!(a < b);
    }
}
