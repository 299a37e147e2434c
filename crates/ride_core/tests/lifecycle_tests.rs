mod support;

use ride_core::model::{Identity, TripStatus};
use ride_core::test_helpers::{offset_north, test_origin, trip_request};
use ride_core::RideError;
use support::service::{pooling_captain, TestServiceBuilder};

#[tokio::test]
async fn otp_is_checked_once_and_exactly() {
    let service = TestServiceBuilder::new().build();
    let origin = test_origin();
    let _c = pooling_captain(&service, "c1", offset_north(origin, 90.0)).await;
    let captain = Identity::captain("c1");

    let ticket = service
        .request_trip(&Identity::rider("r1"), trip_request(origin, 1))
        .await
        .expect("request");
    assert_eq!(ticket.otp.len(), 4);
    service
        .accept_trip(ticket.trip_id, &captain)
        .await
        .expect("accept");

    let wrong = if ticket.otp == "1000" { "1001" } else { "1000" };
    let err = service
        .verify_pickup(ticket.trip_id, &captain, wrong)
        .await
        .expect_err("wrong code");
    assert!(matches!(err, RideError::InvalidTransition(_)));

    let trip = service
        .verify_pickup(ticket.trip_id, &captain, &ticket.otp)
        .await
        .expect("right code");
    assert_eq!(trip.status, TripStatus::OnTrip);

    let err = service
        .verify_pickup(ticket.trip_id, &captain, &ticket.otp)
        .await
        .expect_err("second use");
    assert!(matches!(err, RideError::InvalidTransition(_)));
}

#[tokio::test]
async fn statuses_only_move_forward() {
    let service = TestServiceBuilder::new().build();
    let origin = test_origin();
    let _c = pooling_captain(&service, "c1", offset_north(origin, 90.0)).await;
    let captain = Identity::captain("c1");
    let rider = Identity::rider("r1");

    let ticket = service
        .request_trip(&rider, trip_request(origin, 1))
        .await
        .expect("request");
    let mut seen = vec![TripStatus::Requested];

    seen.push(
        service
            .accept_trip(ticket.trip_id, &captain)
            .await
            .expect("accept")
            .status,
    );
    seen.push(
        service
            .verify_pickup(ticket.trip_id, &captain, &ticket.otp)
            .await
            .expect("pickup")
            .status,
    );

    assert!(service.cancel_trip(ticket.trip_id, &rider).await.is_err());
    assert!(service.cancel_trip(ticket.trip_id, &captain).await.is_err());

    seen.push(
        service
            .complete_trip(ticket.trip_id, &captain)
            .await
            .expect("complete")
            .status,
    );
    assert!(service.complete_trip(ticket.trip_id, &captain).await.is_err());
    assert!(service.cancel_trip(ticket.trip_id, &rider).await.is_err());

    assert_eq!(
        seen,
        [
            TripStatus::Requested,
            TripStatus::Accepted,
            TripStatus::OnTrip,
            TripStatus::Completed
        ]
    );
    let detail = service
        .trip_detail(ticket.trip_id, &rider)
        .await
        .expect("detail");
    assert_eq!(detail.trip.status, TripStatus::Completed);
}

#[tokio::test]
async fn completion_releases_without_repooling() {
    let service = TestServiceBuilder::new().build();
    let origin = test_origin();
    let _c = pooling_captain(&service, "c1", offset_north(origin, 90.0)).await;
    let captain = Identity::captain("c1");

    let ticket = service
        .request_trip(&Identity::rider("r1"), trip_request(origin, 1))
        .await
        .expect("request");
    service
        .accept_trip(ticket.trip_id, &captain)
        .await
        .expect("accept");
    service
        .verify_pickup(ticket.trip_id, &captain, &ticket.otp)
        .await
        .expect("pickup");
    service
        .complete_trip(ticket.trip_id, &captain)
        .await
        .expect("complete");

    let row = service.captain("c1").await.expect("read").expect("row");
    assert!(!row.assigned_to_trip);
    assert!(!row.pooling_for_work);

    let again = service
        .report_location(&captain, offset_north(origin, 95.0))
        .await
        .expect("pool again");
    assert!(again.pooling_for_work);
    assert!(!again.assigned_to_trip);
}

#[tokio::test]
async fn cancelling_accepted_trip_frees_captain_for_next_match() {
    let service = TestServiceBuilder::new().build();
    let origin = test_origin();
    let _c = pooling_captain(&service, "c1", offset_north(origin, 90.0)).await;
    let captain = Identity::captain("c1");
    let rider = Identity::rider("r1");

    let ticket = service
        .request_trip(&rider, trip_request(origin, 1))
        .await
        .expect("request");
    service
        .attempt_match(ticket.trip_id)
        .await
        .expect("match")
        .expect("matched");
    let cancelled = service
        .cancel_trip(ticket.trip_id, &rider)
        .await
        .expect("rider cancels accepted trip");
    assert_eq!(cancelled.status, TripStatus::Cancelled);

    let row = service.captain("c1").await.expect("read").expect("row");
    assert!(!row.assigned_to_trip);

    service
        .report_location(&captain, offset_north(origin, 90.0))
        .await
        .expect("pool");
    let next = service
        .request_trip(&Identity::rider("r2"), trip_request(origin, 1))
        .await
        .expect("request");
    let matched = service
        .attempt_match(next.trip_id)
        .await
        .expect("match")
        .expect("captain free again");
    assert_eq!(matched.captain_id, "c1");
}

#[tokio::test]
async fn strangers_cannot_read_or_subscribe() {
    let service = TestServiceBuilder::new().build();
    let ticket = service
        .request_trip(&Identity::rider("r1"), trip_request(test_origin(), 1))
        .await
        .expect("request");

    let err = service
        .trip_detail(ticket.trip_id, &Identity::rider("r2"))
        .await
        .expect_err("other rider");
    assert!(matches!(err, RideError::Unauthorized(_)));

    let err = service
        .subscribe(ticket.trip_id, &Identity::captain("c9"))
        .await
        .expect_err("unassigned captain");
    assert!(matches!(err, RideError::Unauthorized(_)));
}
