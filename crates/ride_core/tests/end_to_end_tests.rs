mod support;

use ride_core::model::{Identity, TripStatus};
use ride_core::protocol::ServerEvent;
use ride_core::test_helpers::{offset_north, test_origin, trip_request};
use serde_json::json;
use support::channels::{assert_quiet, next_event};
use support::service::{pooling_captain, TestServiceBuilder};

fn expect_status(event: ServerEvent, status: TripStatus) {
    match event {
        ServerEvent::StatusUpdate(update) => assert_eq!(update.status, status),
        other => panic!("expected {status} status update, got {other:?}"),
    }
}

#[tokio::test]
async fn trip_runs_from_request_to_completion() {
    let service = TestServiceBuilder::new().with_auto_dispatch(true).build();
    let origin = test_origin();
    let mut captain_a = pooling_captain(&service, "A", offset_north(origin, 100.0)).await;
    let mut captain_b = pooling_captain(&service, "B", offset_north(origin, 1_000.0)).await;
    let rider = Identity::rider("U");
    let mut rider_conn = service.connect(rider.clone());

    let ticket = service
        .request_trip(&rider, trip_request(origin, 2))
        .await
        .expect("request");

    expect_status(next_event(&mut rider_conn.outbound).await, TripStatus::Accepted);
    expect_status(next_event(&mut captain_a.outbound).await, TripStatus::Accepted);

    let a = Identity::captain("A");
    let row = service.captain("A").await.expect("read").expect("row");
    assert!(row.assigned_to_trip);
    assert!(!row.pooling_for_work);

    // Live location from A reaches U.
    let moved = offset_north(origin, 60.0);
    let frame = json!({
        "type": "send:location",
        "payload": {"lat": moved.lat, "long": moved.lng, "tripId": ticket.trip_id}
    })
    .to_string();
    assert!(service.handle_frame(&a, &frame).await.is_empty());
    match next_event(&mut rider_conn.outbound).await {
        ServerEvent::LocationUpdate(update) => {
            assert_eq!(update.trip_id, ticket.trip_id);
            assert!((update.lat - moved.lat).abs() < 1e-9);
            assert!((update.long - moved.lng).abs() < 1e-9);
        }
        other => panic!("expected location update, got {other:?}"),
    }

    // A late subscriber gets the current status and the captain's last position.
    let subscribe = json!({"type": "subscribe:trip", "payload": {"tripId": ticket.trip_id}})
        .to_string();
    let replies = service.handle_frame(&rider, &subscribe).await;
    assert_eq!(replies.len(), 2);
    match &replies[0] {
        ServerEvent::Subscribed(snapshot) => assert_eq!(snapshot.status, TripStatus::Accepted),
        other => panic!("expected subscribed, got {other:?}"),
    }
    match &replies[1] {
        ServerEvent::LocationUpdate(update) => assert!((update.lat - moved.lat).abs() < 1e-9),
        other => panic!("expected captain location, got {other:?}"),
    }

    service
        .verify_pickup(ticket.trip_id, &a, &ticket.otp)
        .await
        .expect("pickup");
    expect_status(next_event(&mut rider_conn.outbound).await, TripStatus::OnTrip);
    expect_status(next_event(&mut captain_a.outbound).await, TripStatus::OnTrip);

    let done = service
        .complete_trip(ticket.trip_id, &a)
        .await
        .expect("complete");
    assert_eq!(done.status, TripStatus::Completed);
    assert_eq!(done.capacity, 2);
    expect_status(next_event(&mut rider_conn.outbound).await, TripStatus::Completed);
    expect_status(next_event(&mut captain_a.outbound).await, TripStatus::Completed);

    let row = service.captain("A").await.expect("read").expect("row");
    assert!(!row.assigned_to_trip);

    assert_quiet(&mut captain_b.outbound).await;
    let history = service.trip_history(&rider).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].captain_id.as_deref(), Some("A"));
}
