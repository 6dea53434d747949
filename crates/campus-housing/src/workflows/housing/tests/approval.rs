use super::common::*;
use crate::workflows::housing::{
    ApprovalAction, ApprovalTier, ApproverRole, HousingError, RequestId, RequestStatus,
};

#[test]
fn twelve_hundred_square_metres_needs_all_three_tiers() {
    let (service, _, clock) = build_service();

    let request = service
        .submit_request(request_submission(1200.0))
        .expect("submission accepted");
    assert_eq!(request.status, RequestStatus::PendingTier1);
    assert_eq!(request.required_tier(), ApprovalTier::Tier3);

    clock.advance(30);
    let tier1 = service
        .approve(&request.id, ApproverRole::DelegatedVicePresident, "space fits")
        .expect("tier 1 forwards");
    assert_eq!(tier1.status, RequestStatus::PendingTier2);

    clock.advance(30);
    let tier2 = service
        .approve(&request.id, ApproverRole::HousingLeadershipGroup, "agreed")
        .expect("tier 2 forwards");
    assert_eq!(tier2.status, RequestStatus::PendingTier3);

    clock.advance(30);
    let tier3 = service
        .approve(&request.id, ApproverRole::PresidentsOffice, "final")
        .expect("tier 3 approves");
    assert_eq!(tier3.status, RequestStatus::Approved);

    let actions: Vec<_> = tier3.approvals.iter().map(|event| event.action).collect();
    assert_eq!(
        actions,
        vec![
            ApprovalAction::Forward,
            ApprovalAction::Forward,
            ApprovalAction::Approve
        ]
    );
    assert!(tier3.history_consistent());

    let stored = service.get_request(&request.id).expect("stored");
    assert_eq!(stored, tier3);
}

#[test]
fn approver_of_another_tier_cannot_act() {
    let (service, _, _) = build_service();
    let request = service
        .submit_request(request_submission(700.0))
        .expect("submission accepted");

    let error = service
        .approve(&request.id, ApproverRole::HousingLeadershipGroup, "")
        .expect_err("tier 2 cannot act on tier 1");
    assert!(matches!(error, HousingError::UnauthorizedApprover { .. }));

    let stored = service.get_request(&request.id).expect("stored");
    assert_eq!(stored.status, RequestStatus::PendingTier1);
    assert!(stored.approvals.is_empty());
}

#[test]
fn rejection_is_possible_from_every_pending_tier_and_final() {
    let (service, _, _) = build_service();

    for depth in 0..3 {
        let request = service
            .submit_request(request_submission(1500.0))
            .expect("submission accepted");
        let mut current = request;
        for _ in 0..depth {
            let tier = current.status.pending_tier().expect("still pending");
            current = service
                .approve(&current.id, tier.designated_role(), "")
                .expect("forwards");
        }

        let tier = current.status.pending_tier().expect("still pending");
        let rejected = service
            .reject(&current.id, tier.designated_role(), "budget exhausted")
            .expect("rejects");
        assert_eq!(rejected.status, RequestStatus::Rejected);

        for role in ALL_ROLES {
            let error = service
                .approve(&current.id, role, "")
                .expect_err("rejected stays rejected");
            assert_eq!(error.code(), "invalid_state_transition");
        }
    }
}

#[test]
fn rejection_without_reason_is_a_validation_error() {
    let (service, _, _) = build_service();
    let request = service
        .submit_request(request_submission(90.0))
        .expect("submission accepted");

    let error = service
        .reject(&request.id, ApproverRole::DelegatedVicePresident, "   ")
        .expect_err("empty reason");
    assert_eq!(error.code(), "validation_error");
    assert_eq!(
        service.get_request(&request.id).expect("stored").status,
        RequestStatus::PendingTier1
    );
}

#[test]
fn invalid_submission_is_rejected_before_storage() {
    let (service, _, _) = build_service();
    let mut submission = request_submission(-5.0);
    submission.applicant = "Wang Fang".to_string();

    let error = service
        .submit_request(submission)
        .expect_err("negative area");
    assert!(matches!(error, HousingError::Validation(_)));
    assert!(service.list_requests(None).expect("listing").is_empty());
}

#[test]
fn batch_approval_reports_skips_without_aborting() {
    let (service, _, _) = build_service();
    let small = service
        .submit_request(request_submission(120.0))
        .expect("submission accepted");
    let medium = service
        .submit_request(request_submission(640.0))
        .expect("submission accepted");
    let rejected = service
        .submit_request(request_submission(80.0))
        .expect("submission accepted");
    service
        .reject(
            &rejected.id,
            ApproverRole::DelegatedVicePresident,
            "duplicate",
        )
        .expect("rejects");
    let missing = RequestId::from("req-missing");

    let report = service.batch_approve(
        &[
            small.id.clone(),
            rejected.id.clone(),
            missing.clone(),
            medium.id.clone(),
        ],
        ApproverRole::DelegatedVicePresident,
        "batch",
    );

    let transitioned: Vec<_> = report
        .transitioned
        .iter()
        .map(|request| (request.id.clone(), request.status))
        .collect();
    assert_eq!(
        transitioned,
        vec![
            (small.id.clone(), RequestStatus::Approved),
            (medium.id.clone(), RequestStatus::PendingTier2),
        ]
    );

    let skipped: Vec<_> = report
        .skipped
        .iter()
        .map(|skip| (skip.request_id.clone(), skip.code))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (rejected.id, "invalid_state_transition"),
            (missing, "not_found"),
        ]
    );
}

#[test]
fn unknown_request_is_not_found() {
    let (service, _, _) = build_service();
    let error = service
        .approve(
            &RequestId::from("req-404"),
            ApproverRole::DelegatedVicePresident,
            "",
        )
        .expect_err("missing");
    assert_eq!(error.code(), "not_found");
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let service = unavailable_service();
    let error = service
        .submit_request(request_submission(50.0))
        .expect_err("store offline");
    assert_eq!(error.code(), "repository_unavailable");
}
