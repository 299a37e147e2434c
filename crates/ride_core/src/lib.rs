//! Ride dispatch core: geospatial captain lookup, atomic trip claims, the trip
//! lifecycle, and real-time fan-out to a trip's rider and captain.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod matching;
pub mod model;
pub mod notify;
pub mod otp;
pub mod pricing;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod spatial;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{RideError, RideResult};
pub use service::RideService;
