//! Booking fixtures and in-memory booking sources.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;

use cab_planner::error::BookingSourceError;
use cab_planner::region::RegionCatalog;
use cab_planner::traits::{Booking, BookingSource};

/// Riders per region in the deployed Friday scenario (42 riders).
pub const FRIDAY_DEMAND: [u32; 7] = [10, 5, 0, 14, 1, 7, 5];

/// Builder for test bookings with sensible defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestBooking {
    pub id: String,
    pub rider: String,
    pub trip: String,
    pub region: String,
    pub booked_at: i64,
}

impl TestBooking {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            rider: format!("rider-{}", id),
            trip: "friday".to_string(),
            region: "RK".to_string(),
            booked_at: 0,
        }
    }

    pub fn rider(mut self, rider: &str) -> Self {
        self.rider = rider.to_string();
        self
    }

    pub fn trip(mut self, trip: &str) -> Self {
        self.trip = trip.to_string();
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn booked_at(mut self, booked_at: i64) -> Self {
        self.booked_at = booked_at;
        self
    }
}

impl Booking for TestBooking {
    type Id = String;
    type RiderId = String;
    type TripId = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn rider_id(&self) -> &String {
        &self.rider
    }

    fn trip_id(&self) -> &String {
        &self.trip
    }

    fn origin_region(&self) -> &str {
        &self.region
    }

    fn booked_at(&self) -> i64 {
        self.booked_at
    }
}

/// One booking per rider, `counts[i]` riders from region `i` of the deployed
/// catalog. Riders are named `<code>-<n>` and booked in increasing `n`.
pub fn bookings_for_demand(trip: &str, counts: &[u32]) -> Vec<TestBooking> {
    let catalog = RegionCatalog::deployed();
    let mut bookings = Vec::new();
    let mut clock = 0;
    for (region, &count) in counts.iter().enumerate() {
        let code = catalog.code(region).expect("region in deployed catalog");
        for n in 1..=count {
            clock += 1;
            bookings.push(
                TestBooking::new(&format!("{}-{}-{}", trip, code, n))
                    .rider(&format!("{}-{}", code, n))
                    .trip(trip)
                    .region(code)
                    .booked_at(clock),
            );
        }
    }
    bookings
}

/// Booking source backed by a map of trip to bookings.
#[derive(Default)]
pub struct StaticSource {
    trips: Mutex<HashMap<String, Vec<TestBooking>>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trip(self, trip: &str, bookings: Vec<TestBooking>) -> Self {
        self.set_bookings(trip, bookings);
        self
    }

    pub fn set_bookings(&self, trip: &str, bookings: Vec<TestBooking>) {
        self.trips
            .lock()
            .unwrap()
            .insert(trip.to_string(), bookings);
    }
}

impl BookingSource for StaticSource {
    type Booking = TestBooking;

    fn confirmed_bookings(&self, trip_id: &String) -> Result<Vec<TestBooking>, BookingSourceError> {
        self.trips
            .lock()
            .unwrap()
            .get(trip_id)
            .cloned()
            .ok_or_else(|| BookingSourceError::UnknownTrip(trip_id.clone()))
    }
}

/// Booking source that parks fetches for one trip until released, so a test
/// can hold an allocation run in flight.
pub struct GatedSource {
    inner: StaticSource,
    gated_trip: String,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl GatedSource {
    pub fn new(
        inner: StaticSource,
        gated_trip: &str,
        entered: Sender<()>,
        release: Receiver<()>,
    ) -> Self {
        Self {
            inner,
            gated_trip: gated_trip.to_string(),
            entered: Mutex::new(entered),
            release: Mutex::new(release),
        }
    }
}

impl BookingSource for GatedSource {
    type Booking = TestBooking;

    fn confirmed_bookings(&self, trip_id: &String) -> Result<Vec<TestBooking>, BookingSourceError> {
        if *trip_id == self.gated_trip {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.confirmed_bookings(trip_id)
    }
}
