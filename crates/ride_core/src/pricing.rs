//! Simple pricing for trip fares.

use crate::model::Coordinates;
use crate::spatial::haversine_m;

/// Default rate in currency units per kilometer per seat.
pub const RATE_PER_KM_PER_SEAT: f64 = 0.40;

#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    pub rate_per_km_per_seat: f64,
    /// Floor applied to very short trips.
    pub minimum_fare: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rate_per_km_per_seat: RATE_PER_KM_PER_SEAT,
            minimum_fare: 0.0,
        }
    }
}

/// Calculate the fare for a trip, fixed once at request time.
///
/// Formula: `fare = max(minimum_fare, distance_km * capacity * rate_per_km_per_seat)`,
/// rounded to cents.
pub fn calculate_trip_fare(
    origin: Coordinates,
    destination: Coordinates,
    capacity: u32,
    config: &PricingConfig,
) -> f64 {
    let distance_km = haversine_m(origin, destination) / 1_000.0;
    let fare = (distance_km * f64::from(capacity) * config.rate_per_km_per_seat)
        .max(config.minimum_fare)
        .max(0.0);
    (fare * 100.0).round() / 100.0
}
