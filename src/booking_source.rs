//! HTTP adapter for fetching confirmed bookings from the booking service.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BookingSourceError;
use crate::traits::{Booking, BookingSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BookingSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// A confirmed booking as served by the booking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_id: String,
    pub rider_id: String,
    pub trip_id: String,
    /// Hall or region code the rider boards from.
    pub region: String,
    /// Creation time, unix seconds.
    pub booked_at: i64,
}

impl Booking for BookingRecord {
    type Id = String;
    type RiderId = String;
    type TripId = String;

    fn id(&self) -> &String {
        &self.booking_id
    }

    fn rider_id(&self) -> &String {
        &self.rider_id
    }

    fn trip_id(&self) -> &String {
        &self.trip_id
    }

    fn origin_region(&self) -> &str {
        &self.region
    }

    fn booked_at(&self) -> i64 {
        self.booked_at
    }
}

#[derive(Debug, Clone)]
pub struct HttpBookingSource {
    config: BookingSourceConfig,
    client: reqwest::blocking::Client,
}

impl HttpBookingSource {
    pub fn new(config: BookingSourceConfig) -> Result<Self, BookingSourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn bookings_url(&self, trip_id: &str) -> String {
        format!(
            "{}/trips/{}/bookings/confirmed",
            self.config.base_url.trim_end_matches('/'),
            trip_id
        )
    }
}

impl BookingSource for HttpBookingSource {
    type Booking = BookingRecord;

    fn confirmed_bookings(&self, trip_id: &String) -> Result<Vec<BookingRecord>, BookingSourceError> {
        let url = self.bookings_url(trip_id);
        let response = self.client.get(&url).send().inspect_err(|err| {
            warn!(%url, error = %err, "booking service unreachable");
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BookingSourceError::UnknownTrip(trip_id.clone()));
        }

        let records = response
            .error_for_status()?
            .json::<Vec<BookingRecord>>()?;
        Ok(records)
    }
}
