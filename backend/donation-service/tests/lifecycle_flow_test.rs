//! Integration Tests: donation request lifecycle
//!
//! Drives the lifecycle engine end to end against the in-memory store.
//!
//! Coverage:
//! - Allotment closes out competing requests; later confirms conflict
//! - Duplicate requests, reviews and reports are rejected without side effects
//! - Completion requires a confirmed request
//! - Rating average is recomputed over the full review set (create and delete)
//! - Report parties are derived from the donation
//! - Concurrent confirms on one donation produce exactly one winner
//! - Expiry sweep only touches past-due pending donations
//! - Admin listing filters by status, address area and creation window

mod common;

use chrono::{Duration, Utc};
use common::*;
use donation_service::error::AppError;
use donation_service::models::{
    CreateReportInput, DonationFilter, DonationStatus, ModerateReportInput, ReportStatus, ReportType,
    RequestStatus, DONATION_EXPIRED_REASON, SIBLING_ALLOTTED_REASON,
};
use donation_service::services::LifecycleEngine;
use uuid::Uuid;

fn assert_conflict<T: std::fmt::Debug>(result: Result<T, AppError>, message: &str) {
    match result {
        Err(AppError::Conflict(m)) => assert_eq!(m, message),
        other => panic!("expected Conflict({message}), got {other:?}"),
    }
}

/// receiver is set exactly when the donation is allotted or picked up
async fn assert_receiver_invariant(engine: &LifecycleEngine, donation_id: Uuid) {
    let donation = engine.get_donation(donation_id).await.unwrap();
    assert_eq!(
        donation.receiver_id.is_some(),
        donation.status.has_receiver(),
        "receiver/status mismatch: {:?} with {:?}",
        donation.status,
        donation.receiver_id
    );
}

fn report_input(donation_id: Uuid, report_type: &str) -> CreateReportInput {
    CreateReportInput {
        donation_id,
        report_type: report_type.to_string(),
        reason: "Did not turn up in the pickup window".to_string(),
        evidence: None,
    }
}

#[tokio::test]
async fn test_end_to_end_allotment_and_review() {
    let (engine, _) = memory_engine();
    let (donor, receiver_a, receiver_b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let donation = post_donation(&engine, donor).await;
    assert_eq!(donation.status, DonationStatus::Pending);
    assert_eq!(donation.quantity.value, 10.0);
    assert_receiver_invariant(&engine, donation.id).await;

    let request_a = request_donation(&engine, &donation, receiver_a).await;
    let request_b = request_donation(&engine, &donation, receiver_b).await;
    assert_eq!(request_a.donor_id, donor);
    assert_receiver_invariant(&engine, donation.id).await;

    let allotment = engine.confirm_request(request_a.id, donor).await.unwrap();
    assert_eq!(allotment.request.status, RequestStatus::Confirmed);
    assert_eq!(allotment.donation.status, DonationStatus::Allotted);
    assert_eq!(allotment.donation.receiver_id, Some(receiver_a));
    assert_eq!(allotment.declined_requests.len(), 1);
    assert_receiver_invariant(&engine, donation.id).await;

    let b_requests = engine.list_receiver_requests(receiver_b).await.unwrap();
    assert_eq!(b_requests[0].id, request_b.id);
    assert_eq!(b_requests[0].status, RequestStatus::Declined);
    assert_eq!(
        b_requests[0].decline_reason.as_deref(),
        Some(SIBLING_ALLOTTED_REASON)
    );

    let completion = engine.complete_request(request_a.id, donor).await.unwrap();
    assert_eq!(completion.donation.status, DonationStatus::PickedUp);
    assert_eq!(completion.request.status, RequestStatus::Completed);
    assert!(completion.donation.picked_up_at.is_some());
    assert_receiver_invariant(&engine, donation.id).await;

    engine
        .create_review(receiver_a, review_input(donation.id, 5))
        .await
        .unwrap();
    let stats = engine.get_user_stats(donor).await.unwrap().unwrap();
    assert_eq!(stats.average_rating, 5.0);
    assert_eq!(stats.review_count, 1);
    assert_eq!(stats.total_donations, 1);
    assert_eq!(stats.total_quantity_donated, 10.0);

    let a_requests = engine.list_receiver_requests(receiver_a).await.unwrap();
    assert!(a_requests[0].reviewed);
}

#[tokio::test]
async fn test_confirm_declines_every_sibling() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();
    let donation = post_donation(&engine, donor).await;

    let mut requests = Vec::new();
    for _ in 0..5 {
        requests.push(request_donation(&engine, &donation, Uuid::new_v4()).await);
    }

    let allotment = engine.confirm_request(requests[2].id, donor).await.unwrap();
    assert_eq!(allotment.declined_requests.len(), 4);

    let incoming = engine.list_incoming_requests(donor).await.unwrap();
    let confirmed = incoming
        .iter()
        .filter(|r| r.status == RequestStatus::Confirmed)
        .count();
    let declined = incoming
        .iter()
        .filter(|r| r.status == RequestStatus::Declined)
        .count();
    assert_eq!((confirmed, declined), (1, 4));

    for sibling in requests.iter().filter(|r| r.id != requests[2].id) {
        assert_conflict(
            engine.confirm_request(sibling.id, donor).await,
            "Request already processed",
        );
    }
    assert_conflict(
        engine.confirm_request(requests[2].id, donor).await,
        "Request already processed",
    );
    assert_receiver_invariant(&engine, donation.id).await;
}

#[tokio::test]
async fn test_duplicate_request_conflicts_and_keeps_first() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = post_donation(&engine, donor).await;

    let first = request_donation(&engine, &donation, receiver).await;
    assert_conflict(
        engine
            .create_request(receiver, request_input(donation.id))
            .await,
        "You already requested this donation",
    );

    let mine = engine.list_receiver_requests(receiver).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);
    assert_eq!(mine[0].status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_request_rejected_when_donation_unavailable() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();

    let missing = engine
        .create_request(Uuid::new_v4(), request_input(Uuid::new_v4()))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(ref m)) if m == "Donation not found"));

    // Allotted donations take no more requests
    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, Uuid::new_v4()).await;
    engine.confirm_request(request.id, donor).await.unwrap();
    assert_conflict(
        engine
            .create_request(Uuid::new_v4(), request_input(donation.id))
            .await,
        "Donation is no longer available",
    );

    // Neither do donations whose expiry has passed but haven't been swept yet
    let now = Utc::now();
    let mut stale = donation_input(now);
    stale.pickup_time_start = now - Duration::hours(5);
    stale.pickup_time_end = now - Duration::hours(3);
    stale.expires_at = now - Duration::hours(2);
    let stale = engine.create_donation(donor, stale).await.unwrap();
    assert_conflict(
        engine
            .create_request(Uuid::new_v4(), request_input(stale.id))
            .await,
        "Donation is no longer available",
    );
}

#[tokio::test]
async fn test_only_owning_donor_can_act() {
    let (engine, _) = memory_engine();
    let (donor, receiver, stranger) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, receiver).await;

    for result in [
        engine.confirm_request(request.id, stranger).await.map(|_| ()),
        engine
            .decline_request(request.id, stranger, None)
            .await
            .map(|_| ()),
        engine.complete_request(request.id, stranger).await.map(|_| ()),
        // The receiver can't confirm their own request either
        engine.confirm_request(request.id, receiver).await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(AppError::Forbidden(ref m)) if m == "Not authorized"));
    }

    let missing = engine.confirm_request(Uuid::new_v4(), donor).await;
    assert!(matches!(missing, Err(AppError::NotFound(ref m)) if m == "Request not found"));

    // Nothing moved
    let donation = engine.get_donation(donation.id).await.unwrap();
    assert_eq!(donation.status, DonationStatus::Pending);
}

#[tokio::test]
async fn test_decline_keeps_donation_open() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, receiver).await;

    let declined = engine.decline_request(request.id, donor, None).await.unwrap();
    assert_eq!(declined.status, RequestStatus::Declined);
    assert_eq!(declined.decline_reason.as_deref(), Some("No reason provided"));

    let donation = engine.get_donation(donation.id).await.unwrap();
    assert_eq!(donation.status, DonationStatus::Pending);
    assert!(donation.receiver_id.is_none());

    assert_conflict(
        engine
            .decline_request(request.id, donor, Some("Changed my mind".into()))
            .await,
        "Request already processed",
    );
    assert_conflict(
        engine.confirm_request(request.id, donor).await,
        "Request already processed",
    );
}

#[tokio::test]
async fn test_complete_requires_confirmed_request() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, receiver).await;

    assert_conflict(
        engine.complete_request(request.id, donor).await,
        "Only confirmed requests can be completed",
    );

    engine.decline_request(request.id, donor, None).await.unwrap();
    assert_conflict(
        engine.complete_request(request.id, donor).await,
        "Only confirmed requests can be completed",
    );

    let donation = engine.get_donation(donation.id).await.unwrap();
    assert_eq!(donation.status, DonationStatus::Pending);
    assert_receiver_invariant(&engine, donation.id).await;
}

#[tokio::test]
async fn test_receiver_can_cancel_own_pending_request() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, receiver).await;

    let err = engine
        .cancel_request(request.id, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = engine
        .cancel_request(request.id, receiver, Some("Found food elsewhere".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("Found food elsewhere")
    );

    assert_conflict(
        engine.confirm_request(request.id, donor).await,
        "Request already processed",
    );
}

#[tokio::test]
async fn test_second_review_conflicts() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = handed_over(&engine, donor, receiver).await;
    assert_eq!(donation.status, DonationStatus::PickedUp);

    engine
        .create_review(receiver, review_input(donation.id, 4))
        .await
        .unwrap();
    assert_conflict(
        engine
            .create_review(receiver, review_input(donation.id, 1))
            .await,
        "Already reviewed this donation",
    );

    let reviews = engine.list_user_reviews(donor).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, 4);
}

#[tokio::test]
async fn test_review_preconditions_in_order() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());

    let missing = engine
        .create_review(receiver, review_input(Uuid::new_v4(), 5))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let donation = post_donation(&engine, donor).await;
    let request = request_donation(&engine, &donation, receiver).await;
    engine.confirm_request(request.id, donor).await.unwrap();

    let stranger = engine
        .create_review(Uuid::new_v4(), review_input(donation.id, 5))
        .await;
    assert!(
        matches!(stranger, Err(AppError::Forbidden(ref m)) if m == "Only receiver can review")
    );

    assert_conflict(
        engine
            .create_review(receiver, review_input(donation.id, 5))
            .await,
        "Can only review completed donations",
    );

    let out_of_range = engine
        .create_review(receiver, review_input(donation.id, 6))
        .await;
    assert!(matches!(out_of_range, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_average_rating_is_exact_mean() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();

    for rating in [5, 3, 4] {
        let receiver = Uuid::new_v4();
        let donation = handed_over(&engine, donor, receiver).await;
        engine
            .create_review(receiver, review_input(donation.id, rating))
            .await
            .unwrap();
    }

    let stats = engine.get_user_stats(donor).await.unwrap().unwrap();
    assert_eq!(stats.average_rating, 4.0);
    assert_eq!(stats.review_count, 3);
}

#[tokio::test]
async fn test_deleting_review_recomputes_average() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();

    let mut review_ids = Vec::new();
    for rating in [5, 2] {
        let receiver = Uuid::new_v4();
        let donation = handed_over(&engine, donor, receiver).await;
        let review = engine
            .create_review(receiver, review_input(donation.id, rating))
            .await
            .unwrap();
        review_ids.push(review.id);
    }
    assert_eq!(
        engine.get_user_stats(donor).await.unwrap().unwrap().average_rating,
        3.5
    );

    engine.delete_review(review_ids[1]).await.unwrap();
    let stats = engine.get_user_stats(donor).await.unwrap().unwrap();
    assert_eq!(stats.average_rating, 5.0);
    assert_eq!(stats.review_count, 1);

    engine.delete_review(review_ids[0]).await.unwrap();
    let stats = engine.get_user_stats(donor).await.unwrap().unwrap();
    assert_eq!(stats.average_rating, 0.0);
    assert_eq!(stats.review_count, 0);

    assert!(matches!(
        engine.delete_review(review_ids[0]).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_deleted_review_reopens_reviewing() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = handed_over(&engine, donor, receiver).await;

    let review = engine
        .create_review(receiver, review_input(donation.id, 1))
        .await
        .unwrap();
    assert!(engine.list_receiver_requests(receiver).await.unwrap()[0].reviewed);

    engine.delete_review(review.id).await.unwrap();

    let request = &engine.list_receiver_requests(receiver).await.unwrap()[0];
    assert!(!request.reviewed);
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(engine.can_review(donation.id, receiver).await.unwrap().can_review);

    engine
        .create_review(receiver, review_input(donation.id, 4))
        .await
        .unwrap();
    assert!(engine.list_receiver_requests(receiver).await.unwrap()[0].reviewed);
    assert_eq!(
        engine.get_user_stats(donor).await.unwrap().unwrap().average_rating,
        4.0
    );
}

#[tokio::test]
async fn test_admin_listing_filters_by_area_and_window() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();
    let before = Utc::now();

    let mg_road = post_donation(&engine, donor).await;
    let mut input = donation_input(Utc::now());
    input.location.address = Some("Koramangala 5th Block".to_string());
    let koramangala = engine.create_donation(donor, input).await.unwrap();
    let mut input = donation_input(Utc::now());
    input.location.address = None;
    engine.create_donation(donor, input).await.unwrap();

    let all = engine.list_donations(DonationFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let by_area = engine
        .list_donations(DonationFilter {
            area: Some("  mg road ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_area.len(), 1);
    assert_eq!(by_area[0].id, mg_road.id);

    let blank_area = engine
        .list_donations(DonationFilter {
            area: Some("   ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(blank_area.len(), 3);

    let window = engine
        .list_donations(DonationFilter {
            area: Some("BLOCK".to_string()),
            from: Some(before),
            to: Some(Utc::now()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, koramangala.id);

    let future = engine
        .list_donations(DonationFilter {
            from: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(future.is_empty());

    let past = engine
        .list_donations(DonationFilter {
            to: Some(before - Duration::seconds(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(past.is_empty());

    let inverted = engine
        .list_donations(DonationFilter {
            from: Some(Utc::now()),
            to: Some(before),
            ..Default::default()
        })
        .await;
    assert!(matches!(inverted, Err(AppError::ValidationError(_))));

    let bad_status = engine
        .list_donations(DonationFilter {
            status: Some("stale".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(bad_status, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_can_review_mirrors_create_review() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());

    let check = engine.can_review(Uuid::new_v4(), receiver).await.unwrap();
    assert!(!check.can_review);
    assert_eq!(check.message, "Donation not found");

    let donation = handed_over(&engine, donor, receiver).await;
    let check = engine.can_review(donation.id, donor).await.unwrap();
    assert!(!check.can_review);
    assert_eq!(check.message, "Only receiver can review");

    assert!(engine.can_review(donation.id, receiver).await.unwrap().can_review);

    engine
        .create_review(receiver, review_input(donation.id, 5))
        .await
        .unwrap();
    let check = engine.can_review(donation.id, receiver).await.unwrap();
    assert!(!check.can_review);
    assert!(check.review.is_some());
}

#[tokio::test]
async fn test_report_parties_are_derived() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = handed_over(&engine, donor, receiver).await;

    let err = engine
        .create_report(receiver, report_input(donation.id, "no_show"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(ref m) if m == "Only donor can report no-show"));

    let no_show = engine
        .create_report(donor, report_input(donation.id, "no_show"))
        .await
        .unwrap();
    assert_eq!(no_show.reported_user_id, receiver);
    assert_eq!(no_show.report_type, ReportType::NoShow);
    assert_eq!(no_show.status, ReportStatus::Pending);

    let expired = engine
        .create_report(receiver, report_input(donation.id, "expired_food"))
        .await
        .unwrap();
    assert_eq!(expired.reported_user_id, donor);

    assert_conflict(
        engine
            .create_report(donor, report_input(donation.id, "no_show"))
            .await,
        "You already reported this issue",
    );

    let against_receiver = engine.list_reports_against(receiver).await.unwrap();
    assert_eq!(against_receiver.len(), 1);
    assert_eq!(engine.list_reporter_reports(receiver).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_type_and_allotment_checks() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();
    let donation = post_donation(&engine, donor).await;

    for bad_type in ["other", "spam", ""] {
        let err = engine
            .create_report(donor, report_input(donation.id, bad_type))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid report type"));
    }

    assert_conflict(
        engine
            .create_report(donor, report_input(donation.id, "no_show"))
            .await,
        "Donation has not been allotted",
    );

    let mut blank = report_input(donation.id, "no_show");
    blank.reason = "   ".to_string();
    assert!(matches!(
        engine.create_report(donor, blank).await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_report_moderation_is_unordered() {
    let (engine, _) = memory_engine();
    let (donor, receiver) = (Uuid::new_v4(), Uuid::new_v4());
    let donation = handed_over(&engine, donor, receiver).await;
    let report = engine
        .create_report(donor, report_input(donation.id, "no_show"))
        .await
        .unwrap();

    let moderate = |status: &str, notes: Option<&str>| ModerateReportInput {
        status: status.to_string(),
        admin_notes: notes.map(str::to_string),
    };

    let dismissed = engine
        .moderate_report(report.id, moderate("dismissed", Some("Insufficient evidence")))
        .await
        .unwrap();
    assert_eq!(dismissed.status, ReportStatus::Dismissed);

    let resolved = engine
        .moderate_report(report.id, moderate("resolved", None))
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.admin_notes.as_deref(), Some("Insufficient evidence"));

    assert!(matches!(
        engine.moderate_report(report.id, moderate("pending", None)).await,
        Err(AppError::ValidationError(_))
    ));
    assert!(matches!(
        engine.moderate_report(Uuid::new_v4(), moderate("reviewed", None)).await,
        Err(AppError::NotFound(_))
    ));

    let resolved_only = engine.list_reports(Some("resolved")).await.unwrap();
    assert_eq!(resolved_only.len(), 1);
    assert!(engine.list_reports(Some("bogus")).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirms_have_one_winner() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();
    let donation = post_donation(&engine, donor).await;

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(request_donation(&engine, &donation, Uuid::new_v4()).await);
    }

    let handles: Vec<_> = requests
        .iter()
        .map(|request| {
            let engine = engine.clone();
            let request_id = request.id;
            tokio::spawn(async move { engine.confirm_request(request_id, donor).await })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(allotment) => winners.push(allotment),
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 7);

    let donation = engine.get_donation(donation.id).await.unwrap();
    assert_eq!(donation.status, DonationStatus::Allotted);
    assert_eq!(donation.receiver_id, Some(winners[0].request.receiver_id));

    let incoming = engine.list_incoming_requests(donor).await.unwrap();
    assert_eq!(
        incoming
            .iter()
            .filter(|r| r.status == RequestStatus::Confirmed)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_expiry_sweep_only_touches_past_due_pending() {
    let (engine, _) = memory_engine();
    let donor = Uuid::new_v4();
    let now = Utc::now();

    let stale = post_donation(&engine, donor).await;
    let waiting = request_donation(&engine, &stale, Uuid::new_v4()).await;

    // Allotted donations keep their receiver even past expiry
    let allotted = post_donation(&engine, donor).await;
    let winner = request_donation(&engine, &allotted, Uuid::new_v4()).await;
    engine.confirm_request(winner.id, donor).await.unwrap();

    // Still fresh at sweep time
    let mut fresh_input = donation_input(now);
    fresh_input.pickup_time_end = now + Duration::hours(20);
    fresh_input.expires_at = now + Duration::hours(24);
    let fresh = engine.create_donation(donor, fresh_input).await.unwrap();

    let sweep_at = now + Duration::hours(7);
    let sweep = engine.expire_stale_donations(sweep_at).await.unwrap();
    assert_eq!(sweep.donations_expired, 1);
    assert_eq!(sweep.requests_declined, 1);

    let stale = engine.get_donation(stale.id).await.unwrap();
    assert_eq!(stale.status, DonationStatus::Expired);
    assert!(stale.receiver_id.is_none());

    let waiting = engine
        .list_incoming_requests(donor)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == waiting.id)
        .unwrap();
    assert_eq!(waiting.status, RequestStatus::Declined);
    assert_eq!(waiting.decline_reason.as_deref(), Some(DONATION_EXPIRED_REASON));

    assert_eq!(
        engine.get_donation(allotted.id).await.unwrap().status,
        DonationStatus::Allotted
    );
    assert_eq!(
        engine.get_donation(fresh.id).await.unwrap().status,
        DonationStatus::Pending
    );

    // A second pass finds nothing new
    let again = engine.expire_stale_donations(sweep_at).await.unwrap();
    assert_eq!(again.donations_expired, 0);

    // Expired donations can't be allotted
    assert_conflict(
        engine.confirm_request(waiting.id, donor).await,
        "Request already processed",
    );
}

#[tokio::test]
async fn test_leaderboard_and_analytics() {
    let (engine, aggregation) = memory_engine();
    let (top_donor, other_donor) = (Uuid::new_v4(), Uuid::new_v4());

    for _ in 0..2 {
        handed_over(&engine, top_donor, Uuid::new_v4()).await;
    }
    let donation = post_donation(&engine, other_donor).await;
    let request = request_donation(&engine, &donation, Uuid::new_v4()).await;
    engine.confirm_request(request.id, other_donor).await.unwrap();
    post_donation(&engine, other_donor).await;

    let board = aggregation
        .leaderboard(donation_service::models::LeaderboardPeriod::Week)
        .await
        .unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].donor_id, top_donor);
    assert_eq!(board[0].total_donations, 2);
    assert_eq!(board[0].total_quantity, 20.0);
    assert_eq!(board[1].donor_id, other_donor);
    assert_eq!(board[1].total_donations, 1);

    let analytics = aggregation.analytics().await.unwrap();
    assert_eq!(analytics.users.total_donors, 2);
    assert_eq!(analytics.users.total_receivers, 3);
    assert_eq!(analytics.users.total, 5);
    assert_eq!(analytics.donations.total, 4);
    assert_eq!(analytics.donations.completed, 2);
    assert_eq!(analytics.donations.pending, 1);
    assert_eq!(analytics.impact.food_saved, 20.0);
    assert_eq!(analytics.impact.meals_provided, 30);
    assert_eq!(analytics.recent_activity.len(), 4);
}
