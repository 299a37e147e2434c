//! Pool 100 captains around a city center, request 300 trips, and drive every
//! matched trip through pickup and completion.
//!
//! Run with: cargo run -p ride_core --example dispatch_run

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ride_core::config::{DispatchConfig, ServiceConfig};
use ride_core::model::{Identity, TripStatus};
use ride_core::test_helpers::{offset_east, offset_north, test_origin, trip_request};
use ride_core::RideService;

#[tokio::main]
async fn main() {
    const NUM_CAPTAINS: usize = 100;
    const NUM_TRIPS: usize = 300;
    const SPREAD_M: f64 = 6_000.0;

    // Matching is driven explicitly below so each result can be followed through.
    let service = RideService::in_memory(ServiceConfig {
        dispatch: DispatchConfig {
            auto_dispatch: false,
            ..DispatchConfig::default()
        },
        ..ServiceConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(123);
    let scatter = |rng: &mut StdRng| {
        let north = rng.gen_range(-SPREAD_M / 2.0..SPREAD_M / 2.0);
        let east = rng.gen_range(-SPREAD_M / 2.0..SPREAD_M / 2.0);
        offset_east(offset_north(test_origin(), north), east)
    };

    // Channels are held so captains stay registered for the whole run.
    let mut connections = Vec::with_capacity(NUM_CAPTAINS);
    for i in 0..NUM_CAPTAINS {
        let captain = Identity::captain(format!("captain-{i}"));
        connections.push(service.connect(captain.clone()));
        let at = scatter(&mut rng);
        service
            .report_location(&captain, at)
            .await
            .expect("pooling report");
    }

    let mut matched = 0;
    let mut completed = 0;
    let mut pickup_m = Vec::new();
    for i in 0..NUM_TRIPS {
        let rider = Identity::rider(format!("rider-{i}"));
        let origin = scatter(&mut rng);
        let ticket = service
            .request_trip(&rider, trip_request(origin, rng.gen_range(1..=3)))
            .await
            .expect("trip request");

        let Some(result) = service
            .attempt_match(ticket.trip_id)
            .await
            .expect("match attempt")
        else {
            continue;
        };
        matched += 1;
        pickup_m.push(result.pickup_distance_m);

        let captain = Identity::captain(result.captain_id.clone());
        service
            .verify_pickup(ticket.trip_id, &captain, &ticket.otp)
            .await
            .expect("pickup");
        let trip = service
            .complete_trip(ticket.trip_id, &captain)
            .await
            .expect("complete");
        if trip.status == TripStatus::Completed {
            completed += 1;
        }

        // Back into the pool near the dropoff.
        service
            .report_location(&captain, trip.destination.coordinates())
            .await
            .expect("re-pool");
    }

    let mean_pickup = if pickup_m.is_empty() {
        0.0
    } else {
        pickup_m.iter().sum::<f64>() / pickup_m.len() as f64
    };
    println!(
        "--- Dispatch run ({} captains, {} trips, seed 123) ---",
        NUM_CAPTAINS, NUM_TRIPS
    );
    println!("Matched trips: {}", matched);
    println!("Completed trips: {}", completed);
    println!("Unmatched trips: {}", NUM_TRIPS - matched);
    println!("Mean pickup distance: {:.0} m", mean_pickup);
    println!("Live connections: {}", service.registry().connection_count());
    drop(connections);
}
