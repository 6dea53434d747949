//! Pure transitions over [`SpaceRequest`]. Each command returns the next aggregate state and
//! leaves the input untouched, so a failed command never needs rolling back.

use chrono::{DateTime, Utc};

use super::request::{ApprovalAction, ApprovalEvent, RequestStatus, SpaceRequest};
use super::tier::{ApprovalTier, ApproverRole};
use crate::workflows::housing::domain::require_text;
use crate::workflows::housing::HousingError;

const ENTITY: &str = "space request";

fn invalid(request: &SpaceRequest, operation: &'static str) -> HousingError {
    HousingError::InvalidStateTransition {
        entity: ENTITY,
        id: request.id.to_string(),
        state: request.status.label().to_string(),
        operation,
    }
}

/// Pending tier of the request, after checking the actor is that tier's approver.
fn authorize(
    request: &SpaceRequest,
    role: ApproverRole,
    operation: &'static str,
) -> Result<ApprovalTier, HousingError> {
    let tier = request
        .status
        .pending_tier()
        .ok_or_else(|| invalid(request, operation))?;

    if tier.designated_role() != role {
        return Err(HousingError::UnauthorizedApprover {
            role: role.label(),
            tier: tier.label(),
        });
    }

    Ok(tier)
}

fn record(
    request: &SpaceRequest,
    tier: ApprovalTier,
    role: ApproverRole,
    action: ApprovalAction,
    comment: &str,
    at: DateTime<Utc>,
    resulting_status: RequestStatus,
) -> SpaceRequest {
    let mut next = request.clone();
    next.status = resulting_status;
    next.approvals.push(ApprovalEvent {
        request_id: request.id.clone(),
        tier,
        actor_role: role,
        action,
        comment: comment.trim().to_string(),
        recorded_at: at,
        resulting_status,
    });
    next
}

/// Forward to the next tier while below the area's required tier, otherwise approve.
pub fn approve(
    request: &SpaceRequest,
    role: ApproverRole,
    comment: &str,
    at: DateTime<Utc>,
) -> Result<SpaceRequest, HousingError> {
    let tier = authorize(request, role, "approve")?;

    let (action, resulting_status) = match tier.next() {
        Some(next) if tier < request.required_tier() => {
            (ApprovalAction::Forward, RequestStatus::pending(next))
        }
        _ => (ApprovalAction::Approve, RequestStatus::Approved),
    };

    Ok(record(
        request,
        tier,
        role,
        action,
        comment,
        at,
        resulting_status,
    ))
}

pub fn reject(
    request: &SpaceRequest,
    role: ApproverRole,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<SpaceRequest, HousingError> {
    require_text(reason, "rejection reason")?;
    let tier = authorize(request, role, "reject")?;

    Ok(record(
        request,
        tier,
        role,
        ApprovalAction::Reject,
        reason,
        at,
        RequestStatus::Rejected,
    ))
}

pub fn mark_allocated(request: &SpaceRequest) -> Result<SpaceRequest, HousingError> {
    if request.status != RequestStatus::Approved {
        return Err(invalid(request, "allocate"));
    }
    let mut next = request.clone();
    next.status = RequestStatus::Allocated;
    Ok(next)
}

pub fn confirm_move_in(request: &SpaceRequest) -> Result<SpaceRequest, HousingError> {
    match request.status {
        RequestStatus::Allocated => {
            let mut next = request.clone();
            next.status = RequestStatus::Completed;
            Ok(next)
        }
        RequestStatus::Completed => Err(HousingError::AlreadyCompleted {
            entity: ENTITY,
            id: request.id.to_string(),
        }),
        _ => Err(invalid(request, "confirm move-in")),
    }
}
