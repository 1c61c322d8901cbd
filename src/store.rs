//! Plan storage and serialized allocation runs.
//!
//! A run pulls bookings for one trip, optimizes, materializes seats and
//! replaces the trip's stored allocation. Only one run per trip may be in
//! flight; a second request for the same trip is rejected instead of racing
//! the first to the store.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::demand::{aggregate_demand, group_riders_by_region};
use crate::error::AllocationError;
use crate::materialize::{RiderAssignment, materialize_assignments};
use crate::region::RegionCatalog;
use crate::solver::{AllocationPlan, optimize_allocation};
use crate::traits::{Booking, BookingSource, Id, PlanStore};

/// A plan together with the seat assignments derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAllocation<RiderId, TripId> {
    pub plan: AllocationPlan,
    pub assignments: Vec<RiderAssignment<RiderId, TripId>>,
}

#[derive(Debug)]
pub struct InMemoryPlanStore<T, R> {
    allocations: Mutex<HashMap<T, StoredAllocation<R, T>>>,
}

impl<T, R> Default for InMemoryPlanStore<T, R> {
    fn default() -> Self {
        Self {
            allocations: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Id, R: Id> InMemoryPlanStore<T, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Id, R: Id> PlanStore for InMemoryPlanStore<T, R> {
    type TripId = T;
    type RiderId = R;

    fn get(&self, trip_id: &T) -> Option<StoredAllocation<R, T>> {
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(trip_id)
            .cloned()
    }

    fn put(&self, trip_id: T, allocation: StoredAllocation<R, T>) {
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(trip_id, allocation);
    }

    fn clear(&self, trip_id: &T) -> bool {
        self.allocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(trip_id)
            .is_some()
    }
}

type TripOf<Src> = <<Src as BookingSource>::Booking as Booking>::TripId;
type RiderOf<Src> = <<Src as BookingSource>::Booking as Booking>::RiderId;

/// Runs allocations for trips, at most one in flight per trip.
pub struct AllocationRunner<Src, S>
where
    Src: BookingSource,
{
    catalog: RegionCatalog,
    config: PlannerConfig,
    source: Src,
    store: S,
    in_flight: Mutex<HashSet<TripOf<Src>>>,
}

impl<Src, S> AllocationRunner<Src, S>
where
    Src: BookingSource,
    S: PlanStore<TripId = TripOf<Src>, RiderId = RiderOf<Src>>,
{
    pub fn new(catalog: RegionCatalog, config: PlannerConfig, source: Src, store: S) -> Self {
        Self {
            catalog,
            config,
            source,
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recomputes and stores the allocation for `trip_id`, replacing any
    /// previous one. Nothing is stored when the run fails.
    pub fn run(
        &self,
        trip_id: &TripOf<Src>,
    ) -> Result<StoredAllocation<RiderOf<Src>, TripOf<Src>>, AllocationError> {
        let _claim = self.claim(trip_id)?;

        let bookings = self.source.confirmed_bookings(trip_id)?;
        let demand = aggregate_demand(&bookings, &self.catalog)?;
        let riders = group_riders_by_region(&bookings, &self.catalog)?;
        let plan = optimize_allocation(
            &demand,
            &self.config.cost,
            self.config.capacity,
            &self.config.solve_options(),
        )?;
        let assignments = materialize_assignments(&plan, &riders)?;

        let allocation = StoredAllocation { plan, assignments };
        self.store.put(trip_id.clone(), allocation.clone());
        info!(
            trip = ?trip_id,
            riders = allocation.assignments.len(),
            vehicles = allocation.plan.total_vehicles(),
            "stored cab allocation"
        );

        Ok(allocation)
    }

    pub fn current(
        &self,
        trip_id: &TripOf<Src>,
    ) -> Option<StoredAllocation<RiderOf<Src>, TripOf<Src>>> {
        self.store.get(trip_id)
    }

    /// Drops the stored allocation. Rejected while a run for the trip is in flight.
    pub fn clear(&self, trip_id: &TripOf<Src>) -> Result<bool, AllocationError> {
        let _claim = self.claim(trip_id)?;
        Ok(self.store.clear(trip_id))
    }

    fn claim(&self, trip_id: &TripOf<Src>) -> Result<RunClaim<'_, TripOf<Src>>, AllocationError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(trip_id.clone()) {
            warn!(trip = ?trip_id, "rejected concurrent allocation run");
            return Err(AllocationError::RunInProgress(format!("{:?}", trip_id)));
        }
        Ok(RunClaim {
            in_flight: &self.in_flight,
            trip_id: trip_id.clone(),
        })
    }
}

/// Releases a trip's in-flight marker when dropped, including on error.
struct RunClaim<'a, T: Id> {
    in_flight: &'a Mutex<HashSet<T>>,
    trip_id: T,
}

impl<T: Id> Drop for RunClaim<'_, T> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.trip_id);
    }
}
