//! Cab allocation optimizer (exact).
//!
//! Solves the fixed-charge transportation model: riders from each origin
//! region are routed to vehicles stationed at some region, every rider is
//! carried, no station exceeds `capacity * vehicles`, and the objective is
//! swap cost plus a flat charge per hired vehicle.
//!
//! The swap cost is a path metric over the ordered regions, so the model is
//! solved exactly by a sweep over the signed rider flow crossing each
//! boundary between adjacent regions. Positive boundary flow moves riders
//! toward the venue (cost α per rider), negative flow moves them away
//! (cost β per rider). Fixing consecutive boundary flows fixes the number of
//! riders boarding at the region between them, and therefore the number of
//! vehicles needed there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::demand::DemandVector;
use crate::error::AllocationError;

/// Operator-tunable costs. All values are in the same integer currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Per region step when a rider boards closer to the venue than home (α).
    pub forward_unit_cost: u64,
    /// Per region step when a rider boards farther from the venue (β).
    pub backward_unit_cost: u64,
    /// Flat charge for hiring one vehicle (C).
    pub vehicle_fixed_cost: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            forward_unit_cost: 1,
            backward_unit_cost: 10,
            vehicle_fixed_cost: 100,
        }
    }
}

impl CostModel {
    pub fn new(forward_unit_cost: u64, backward_unit_cost: u64, vehicle_fixed_cost: u64) -> Self {
        Self {
            forward_unit_cost,
            backward_unit_cost,
            vehicle_fixed_cost,
        }
    }

    /// Requires β > α > 0 and C > 0.
    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.forward_unit_cost == 0 {
            return Err(AllocationError::InvalidInput(
                "forward unit cost must be positive".to_string(),
            ));
        }
        if self.backward_unit_cost <= self.forward_unit_cost {
            return Err(AllocationError::InvalidInput(format!(
                "backward unit cost ({}) must exceed forward unit cost ({})",
                self.backward_unit_cost, self.forward_unit_cost
            )));
        }
        if self.vehicle_fixed_cost == 0 {
            return Err(AllocationError::InvalidInput(
                "vehicle fixed cost must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-rider cost of boarding at `station` when living in `origin`.
    ///
    /// Saturates at `u64::MAX`; any plan routing a rider at that cost
    /// overflows the objective anyway.
    pub fn swap_cost(&self, origin: usize, station: usize) -> u64 {
        self.checked_swap_cost(origin, station).unwrap_or(u64::MAX)
    }

    fn checked_swap_cost(&self, origin: usize, station: usize) -> Option<u64> {
        if station > origin {
            self.forward_unit_cost.checked_mul((station - origin) as u64)
        } else {
            self.backward_unit_cost.checked_mul((origin - station) as u64)
        }
    }

    /// Cost of a signed rider flow across one region boundary, `None` if it
    /// does not fit in `u64`.
    fn boundary_cost(&self, flow: i64) -> Option<u64> {
        if flow >= 0 {
            self.forward_unit_cost.checked_mul(flow as u64)
        } else {
            self.backward_unit_cost.checked_mul(flow.unsigned_abs())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Wall-clock budget for one solve. `None` means unbounded.
    ///
    /// Checked before each boundary state is evaluated, so a solve overruns
    /// the budget by at most one state's scan of its predecessors.
    pub time_budget: Option<Duration>,
    /// Station at least one vehicle in every region that has riders.
    pub require_vehicle_per_demand_region: bool,
}

/// Minimum-cost dispatch plan for one trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Seats per vehicle the plan was solved for.
    pub capacity: u32,
    /// Vehicles dispatched to each region.
    pub vehicles_per_region: Vec<u32>,
    /// `flow[i][j]`: riders from region `i` riding a vehicle stationed at `j`.
    pub flow: Vec<Vec<u32>>,
    pub objective_value: u64,
}

impl AllocationPlan {
    pub fn regions(&self) -> usize {
        self.vehicles_per_region.len()
    }

    /// Riders per origin region (row sums of the flow matrix).
    pub fn demand(&self) -> DemandVector {
        DemandVector::new(self.flow.iter().map(|row| row.iter().sum()).collect())
    }

    /// Riders boarding vehicles stationed at `station`.
    pub fn station_load(&self, station: usize) -> u64 {
        self.flow
            .iter()
            .map(|row| row.get(station).copied().map_or(0, u64::from))
            .sum()
    }

    pub fn total_vehicles(&self) -> u64 {
        self.vehicles_per_region.iter().map(|&v| u64::from(v)).sum()
    }

    /// Empty seats per station.
    pub fn unused_seats(&self) -> Vec<u64> {
        self.vehicles_per_region
            .iter()
            .enumerate()
            .map(|(station, &vehicles)| {
                (u64::from(vehicles) * u64::from(self.capacity))
                    .saturating_sub(self.station_load(station))
            })
            .collect()
    }

    /// Objective value of this plan under `cost`, recomputed from scratch.
    ///
    /// Fails with `InvalidInput` when the value does not fit in `u64`.
    pub fn cost_under(&self, cost: &CostModel) -> Result<u64, AllocationError> {
        let mut total = self
            .total_vehicles()
            .checked_mul(cost.vehicle_fixed_cost)
            .ok_or_else(objective_overflow)?;
        for (origin, row) in self.flow.iter().enumerate() {
            for (station, &riders) in row.iter().enumerate() {
                let swap = cost
                    .checked_swap_cost(origin, station)
                    .and_then(|unit| unit.checked_mul(u64::from(riders)))
                    .ok_or_else(objective_overflow)?;
                total = total.checked_add(swap).ok_or_else(objective_overflow)?;
            }
        }
        Ok(total)
    }

    /// Checks shape and capacity: a square flow matrix matching the vehicle
    /// vector, and no station loaded beyond its seats.
    pub fn check_invariants(&self) -> Result<(), AllocationError> {
        let n = self.regions();
        if self.capacity == 0 {
            return Err(AllocationError::InvalidInput(
                "plan capacity must be positive".to_string(),
            ));
        }
        if self.flow.len() != n || self.flow.iter().any(|row| row.len() != n) {
            return Err(AllocationError::InvalidInput(format!(
                "flow matrix must be {}x{}",
                n, n
            )));
        }
        for station in 0..n {
            let seats = u64::from(self.vehicles_per_region[station]) * u64::from(self.capacity);
            let load = self.station_load(station);
            if load > seats {
                return Err(AllocationError::InvalidInput(format!(
                    "station {} carries {} riders but has only {} seats",
                    station, load, seats
                )));
            }
        }
        Ok(())
    }
}

/// Best known way to reach one boundary state: accumulated cost and the
/// predecessor boundary state.
type Cell = Option<(u64, usize)>;

/// Computes the minimum-cost allocation plan for `demand`.
///
/// Equal-cost plans are resolved deterministically in favour of forward
/// routing, so identical input always yields an identical plan.
pub fn optimize_allocation(
    demand: &DemandVector,
    cost: &CostModel,
    capacity: u32,
    options: &SolveOptions,
) -> Result<AllocationPlan, AllocationError> {
    cost.validate()?;
    if capacity == 0 {
        return Err(AllocationError::InvalidInput(
            "vehicle capacity must be positive".to_string(),
        ));
    }
    if demand.is_empty() {
        return Err(AllocationError::InvalidInput(
            "demand must cover at least one region".to_string(),
        ));
    }

    let n = demand.len();
    let total = demand.total();
    debug!(total_demand = total, regions = n, capacity, "optimizing cab allocation");

    if total == 0 {
        return Ok(AllocationPlan {
            capacity,
            vehicles_per_region: vec![0; n],
            flow: vec![vec![0; n]; n],
            objective_value: 0,
        });
    }

    let started = Instant::now();
    let offset = total as i64;
    let width = 2 * total as usize + 1;
    let counts = demand.counts();

    // Riders at or before each region bound the boundary flow after it:
    // forward flow cannot exceed riders behind the boundary, backward flow
    // cannot exceed riders ahead of it.
    let mut prefix = Vec::with_capacity(n);
    let mut running = 0i64;
    for &count in counts {
        running += i64::from(count);
        prefix.push(running);
    }

    let mut previous: Vec<Option<u64>> = vec![None; width];
    previous[offset as usize] = Some(0);
    let mut previous_range = (0i64, 0i64);
    let mut parents: Vec<Vec<Option<usize>>> = Vec::with_capacity(n);

    // Partial costs past u64::MAX cannot belong to a representable optimum,
    // so those candidates are dropped and only remembered for the error.
    let overflowed = AtomicBool::new(false);
    let timed_out = AtomicBool::new(false);
    let deadline = options
        .time_budget
        .map(|budget| (budget, started.checked_add(budget)));

    for (region, &count) in counts.iter().enumerate() {
        if let Some((budget, _)) = deadline {
            if started.elapsed() >= budget {
                warn!(?budget, region, "cab allocation solver timed out");
                return Err(AllocationError::SolverTimeout { budget });
            }
        }

        let last = region + 1 == n;
        let range = if last {
            (0, 0)
        } else {
            (prefix[region] - offset, prefix[region])
        };
        let riders_here = i64::from(count);
        let force_vehicle = options.require_vehicle_per_demand_region && count > 0;

        let layer: Vec<Cell> = (0..width)
            .into_par_iter()
            .map(|state| {
                let boundary = state as i64 - offset;
                if boundary < range.0 || boundary > range.1 {
                    return None;
                }
                if let Some((_, Some(at))) = deadline {
                    if Instant::now() >= at {
                        timed_out.store(true, Ordering::Relaxed);
                        return None;
                    }
                }
                let crossing = if last {
                    0
                } else {
                    match cost.boundary_cost(boundary) {
                        Some(crossing) => crossing,
                        None => {
                            overflowed.store(true, Ordering::Relaxed);
                            return None;
                        }
                    }
                };

                // Scanning from the most forward incoming flow keeps the first
                // of equal-cost candidates, so ties favour routing toward the venue.
                let mut best: Cell = None;
                for incoming in (previous_range.0..=previous_range.1).rev() {
                    let prev_state = (incoming + offset) as usize;
                    let Some(prev_cost) = previous[prev_state] else {
                        continue;
                    };
                    let boarding = incoming + riders_here - boundary;
                    if boarding < 0 {
                        continue;
                    }
                    let vehicles = vehicles_needed(boarding as u64, capacity, force_vehicle);
                    let Some(candidate) = vehicles
                        .checked_mul(cost.vehicle_fixed_cost)
                        .and_then(|hire| hire.checked_add(prev_cost))
                        .and_then(|partial| partial.checked_add(crossing))
                    else {
                        overflowed.store(true, Ordering::Relaxed);
                        continue;
                    };
                    if best.is_none_or(|(best_cost, _)| candidate < best_cost) {
                        best = Some((candidate, prev_state));
                    }
                }
                best
            })
            .collect();

        if let Some((budget, _)) = deadline {
            if timed_out.load(Ordering::Relaxed) {
                warn!(?budget, region, "cab allocation solver timed out");
                return Err(AllocationError::SolverTimeout { budget });
            }
        }

        previous = layer.iter().map(|cell| cell.map(|(value, _)| value)).collect();
        parents.push(layer.iter().map(|cell| cell.map(|(_, parent)| parent)).collect());
        previous_range = range;
    }

    let objective_value = match previous[offset as usize] {
        Some(value) => value,
        None if overflowed.load(Ordering::Relaxed) => {
            warn!(total_demand = total, "cab allocation objective exceeds u64");
            return Err(objective_overflow());
        }
        None => return Err(AllocationError::NoFeasibleAllocation),
    };

    // Walk the parents back from the closing boundary (zero flow past the
    // last region) to recover every boundary flow.
    let mut boundaries = vec![0i64; n];
    let mut state = offset as usize;
    for region in (0..n).rev() {
        boundaries[region] = state as i64 - offset;
        state = parents[region][state].ok_or(AllocationError::NoFeasibleAllocation)?;
    }

    let mut loads = Vec::with_capacity(n);
    let mut incoming = 0i64;
    for (region, &count) in counts.iter().enumerate() {
        let boarding = incoming + i64::from(count) - boundaries[region];
        loads.push(u32::try_from(boarding).map_err(|_| AllocationError::NoFeasibleAllocation)?);
        incoming = boundaries[region];
    }

    let vehicles_per_region = loads
        .iter()
        .zip(counts)
        .map(|(&load, &count)| {
            let force = options.require_vehicle_per_demand_region && count > 0;
            vehicles_needed(u64::from(load), capacity, force) as u32
        })
        .collect();

    let plan = AllocationPlan {
        capacity,
        vehicles_per_region,
        flow: order_preserving_flow(counts, &loads),
        objective_value,
    };
    debug_assert_eq!(plan.cost_under(cost).ok(), Some(objective_value));

    info!(
        vehicles = plan.total_vehicles(),
        objective = plan.objective_value,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "cab allocation optimized"
    );

    Ok(plan)
}

fn objective_overflow() -> AllocationError {
    AllocationError::InvalidInput("objective exceeds u64".to_string())
}

fn vehicles_needed(riders: u64, capacity: u32, at_least_one: bool) -> u64 {
    let needed = riders.div_ceil(u64::from(capacity));
    if at_least_one { needed.max(1) } else { needed }
}

/// Matches riders to boarding stations in region order (north-west corner
/// rule). On a line this never sends riders both ways across a boundary, so
/// its swap cost equals the boundary-flow cost.
fn order_preserving_flow(demand: &[u32], loads: &[u32]) -> Vec<Vec<u32>> {
    let n = demand.len();
    let mut flow = vec![vec![0u32; n]; n];
    let mut remaining = loads.to_vec();
    let mut station = 0;

    for (origin, &riders) in demand.iter().enumerate() {
        let mut left = riders;
        while left > 0 && station < n {
            if remaining[station] == 0 {
                station += 1;
                continue;
            }
            let moved = left.min(remaining[station]);
            flow[origin][station] += moved;
            remaining[station] -= moved;
            left -= moved;
        }
    }

    flow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(counts: &[u32], capacity: u32) -> AllocationPlan {
        optimize_allocation(
            &DemandVector::new(counts.to_vec()),
            &CostModel::default(),
            capacity,
            &SolveOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_swap_cost_asymmetry() {
        let cost = CostModel::new(1, 10, 100);
        assert_eq!(cost.swap_cost(3, 3), 0);
        assert_eq!(cost.swap_cost(1, 4), 3);
        assert_eq!(cost.swap_cost(4, 1), 30);
    }

    #[test]
    fn test_cost_model_validation() {
        assert!(CostModel::default().validate().is_ok());
        assert!(CostModel::new(0, 10, 100).validate().is_err());
        assert!(CostModel::new(5, 5, 100).validate().is_err());
        assert!(CostModel::new(1, 10, 0).validate().is_err());
    }

    #[test]
    fn test_single_rider_rides_alone() {
        let plan = solve(&[1, 0, 0, 0, 0, 0, 0], 7);
        assert_eq!(plan.vehicles_per_region, vec![1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(plan.flow[0][0], 1);
        assert_eq!(plan.objective_value, 100);
    }

    #[test]
    fn test_two_distant_riders_share_forward_cab() {
        // Sharing at region 5 costs 100 + 5, two cabs cost 200.
        let plan = solve(&[1, 0, 0, 0, 0, 1, 0], 7);
        assert_eq!(plan.vehicles_per_region, vec![0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(plan.flow[0][5], 1);
        assert_eq!(plan.flow[5][5], 1);
        assert_eq!(plan.objective_value, 105);
    }

    #[test]
    fn test_full_regions_stay_home() {
        let plan = solve(&[7; 7], 7);
        assert_eq!(plan.vehicles_per_region, vec![1; 7]);
        assert_eq!(plan.objective_value, 700);
        for (i, row) in plan.flow.iter().enumerate() {
            assert_eq!(row[i], 7);
        }
    }

    #[test]
    fn test_order_preserving_flow() {
        let flow = order_preserving_flow(&[3, 0, 4], &[0, 0, 7]);
        assert_eq!(flow, vec![vec![0, 0, 3], vec![0, 0, 0], vec![0, 0, 4]]);

        let flow = order_preserving_flow(&[2, 5], &[4, 3]);
        assert_eq!(flow, vec![vec![2, 0], vec![2, 3]]);
    }

    #[test]
    fn test_tie_prefers_forward_routing() {
        // Boarding everyone at region 1 or at region 2 both cost 5.
        let plan = optimize_allocation(
            &DemandVector::new(vec![0, 2, 1]),
            &CostModel::new(1, 2, 3),
            3,
            &SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.objective_value, 5);
        assert_eq!(plan.vehicles_per_region, vec![0, 0, 1]);
        assert_eq!(plan.flow, vec![vec![0, 0, 0], vec![0, 0, 2], vec![0, 0, 1]]);
    }

    #[test]
    fn test_objective_overflow_is_rejected() {
        // Two single-seat vehicles cost u64::MAX + 1.
        let cost = CostModel::new(1, 2, u64::MAX / 2 + 1);
        let result = optimize_allocation(
            &DemandVector::new(vec![1, 1]),
            &cost,
            1,
            &SolveOptions::default(),
        );
        match result {
            Err(AllocationError::InvalidInput(reason)) => {
                assert_eq!(reason, "objective exceeds u64")
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_candidates_do_not_win() {
        // Hiring two vehicles overflows; one shared vehicle at region 1 fits.
        let cost = CostModel::new(1, 2, u64::MAX / 2 + 1);
        let plan = optimize_allocation(
            &DemandVector::new(vec![1, 1]),
            &cost,
            2,
            &SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(plan.vehicles_per_region, vec![0, 1]);
        assert_eq!(plan.flow, vec![vec![0, 1], vec![0, 1]]);
        assert_eq!(plan.objective_value, u64::MAX / 2 + 2);
        assert_eq!(plan.cost_under(&cost).unwrap(), plan.objective_value);
    }

    #[test]
    fn test_cost_under_reports_overflow() {
        let plan = AllocationPlan {
            capacity: 1,
            vehicles_per_region: vec![1, 1],
            flow: vec![vec![1, 0], vec![0, 1]],
            objective_value: 0,
        };
        let cost = CostModel::new(1, 2, u64::MAX / 2 + 1);
        assert!(matches!(
            plan.cost_under(&cost),
            Err(AllocationError::InvalidInput(_))
        ));
        assert_eq!(plan.cost_under(&CostModel::default()).unwrap(), 200);
    }

    #[test]
    fn test_vehicles_needed() {
        assert_eq!(vehicles_needed(0, 7, false), 0);
        assert_eq!(vehicles_needed(0, 7, true), 1);
        assert_eq!(vehicles_needed(7, 7, false), 1);
        assert_eq!(vehicles_needed(8, 7, false), 2);
    }

    #[test]
    fn test_unused_seats() {
        let plan = solve(&[10, 5, 0, 14, 1, 7, 5], 7);
        let unused: u64 = plan.unused_seats().iter().sum();
        assert_eq!(unused, plan.total_vehicles() * 7 - 42);
    }

    #[test]
    fn test_check_invariants_rejects_overloaded_station() {
        let plan = AllocationPlan {
            capacity: 2,
            vehicles_per_region: vec![1, 0],
            flow: vec![vec![2, 0], vec![1, 0]],
            objective_value: 0,
        };
        assert!(matches!(
            plan.check_invariants(),
            Err(AllocationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_check_invariants_rejects_ragged_flow() {
        let plan = AllocationPlan {
            capacity: 2,
            vehicles_per_region: vec![1, 1],
            flow: vec![vec![1, 0], vec![1]],
            objective_value: 0,
        };
        assert!(plan.check_invariants().is_err());
    }
}
