//! Collaborator seams for the allocation core.
//!
//! The core never talks to storage or the network directly. Booking data
//! comes in through [`Booking`] / [`BookingSource`], and finished plans go
//! out through [`PlanStore`]. Concrete apps implement these for their own
//! data models.

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::BookingSourceError;
use crate::store::StoredAllocation;

/// Unique identifier for planner entities.
pub trait Id: Clone + Eq + Hash + Debug {}

impl<T> Id for T where T: Clone + Eq + Hash + Debug {}

/// A confirmed seat booking on one trip.
pub trait Booking {
    type Id: Id;
    type RiderId: Id;
    type TripId: Id;

    fn id(&self) -> &Self::Id;

    fn rider_id(&self) -> &Self::RiderId;

    fn trip_id(&self) -> &Self::TripId;

    /// Region or hall code the rider boards from, as recorded on the booking.
    fn origin_region(&self) -> &str;

    /// Booking creation time (unix seconds). Orders riders within a region.
    fn booked_at(&self) -> i64;
}

/// Supplies the confirmed bookings for a trip.
pub trait BookingSource {
    type Booking: Booking;

    fn confirmed_bookings(
        &self,
        trip_id: &<Self::Booking as Booking>::TripId,
    ) -> Result<Vec<Self::Booking>, BookingSourceError>;
}

/// Persists the authoritative allocation for each trip.
///
/// `put` replaces whatever was stored for the trip; plans are never merged.
pub trait PlanStore {
    type TripId: Id;
    type RiderId: Id;

    fn get(&self, trip_id: &Self::TripId) -> Option<StoredAllocation<Self::RiderId, Self::TripId>>;

    fn put(&self, trip_id: Self::TripId, allocation: StoredAllocation<Self::RiderId, Self::TripId>);

    /// Removes the trip's allocation. Returns whether one existed.
    fn clear(&self, trip_id: &Self::TripId) -> bool;
}
