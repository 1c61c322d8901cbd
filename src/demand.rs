//! Demand aggregation: confirmed bookings to per-region rider counts.

use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::region::RegionCatalog;
use crate::traits::Booking;

/// Rider counts per region, indexed in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DemandVector(Vec<u32>);

impl DemandVector {
    pub fn new(counts: Vec<u32>) -> Self {
        Self(counts)
    }

    /// Builds a vector from signed counts, rejecting negatives.
    pub fn try_from_signed(counts: &[i64]) -> Result<Self, AllocationError> {
        counts
            .iter()
            .enumerate()
            .map(|(region, &count)| {
                u32::try_from(count).map_err(|_| {
                    AllocationError::InvalidInput(format!(
                        "demand for region {} must be a non-negative count, got {}",
                        region, count
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn counts(&self) -> &[u32] {
        &self.0
    }

    pub fn get(&self, region: usize) -> u32 {
        self.0.get(region).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&count| u64::from(count)).sum()
    }
}

/// Bookings grouped by origin region, each group in booking order.
#[derive(Debug, Clone)]
pub struct RidersByRegion<'a, B> {
    regions: Vec<Vec<&'a B>>,
}

impl<'a, B> RidersByRegion<'a, B> {
    /// Wraps pre-grouped rider lists, one per region in catalog order.
    pub fn from_lists(regions: Vec<Vec<&'a B>>) -> Self {
        Self { regions }
    }

    pub fn region(&self, index: usize) -> &[&'a B] {
        self.regions.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn demand(&self) -> Result<DemandVector, AllocationError> {
        self.regions
            .iter()
            .enumerate()
            .map(|(region, riders)| rider_count(region, riders.len()))
            .collect::<Result<Vec<_>, _>>()
            .map(DemandVector)
    }
}

/// Counts confirmed riders per region for a single trip.
pub fn aggregate_demand<B: Booking>(
    bookings: &[B],
    catalog: &RegionCatalog,
) -> Result<DemandVector, AllocationError> {
    ensure_single_trip(bookings)?;

    let mut counts = vec![0usize; catalog.len()];
    for booking in bookings {
        let region = catalog.index_of(booking.origin_region())?;
        counts[region] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(region, count)| rider_count(region, count))
        .collect::<Result<Vec<_>, _>>()
        .map(DemandVector)
}

/// Narrows a region's rider count to the `u32` demand entries use.
pub(crate) fn rider_count(region: usize, riders: usize) -> Result<u32, AllocationError> {
    u32::try_from(riders).map_err(|_| {
        AllocationError::InvalidInput(format!(
            "region {} has {} riders, more than a demand entry can hold",
            region, riders
        ))
    })
}

/// Groups bookings by origin region, ordered by booking time within a region.
///
/// Bookings made at the same instant keep their input order.
pub fn group_riders_by_region<'a, B: Booking>(
    bookings: &'a [B],
    catalog: &RegionCatalog,
) -> Result<RidersByRegion<'a, B>, AllocationError> {
    ensure_single_trip(bookings)?;

    let mut regions: Vec<Vec<&'a B>> = vec![Vec::new(); catalog.len()];
    for booking in bookings {
        let region = catalog.index_of(booking.origin_region())?;
        regions[region].push(booking);
    }
    for riders in &mut regions {
        riders.sort_by_key(|booking| booking.booked_at());
    }

    Ok(RidersByRegion { regions })
}

fn ensure_single_trip<B: Booking>(bookings: &[B]) -> Result<(), AllocationError> {
    let Some(first) = bookings.first() else {
        return Ok(());
    };
    match bookings
        .iter()
        .find(|booking| booking.trip_id() != first.trip_id())
    {
        Some(other) => Err(AllocationError::InvalidInput(format!(
            "bookings span trips {:?} and {:?}",
            first.trip_id(),
            other.trip_id()
        ))),
        None => Ok(()),
    }
}
