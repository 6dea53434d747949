use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::tier::{ApprovalTier, ApproverRole};
use crate::workflows::housing::domain::{require_positive_area, require_text, RequestId};
use crate::workflows::housing::HousingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingTier1,
    PendingTier2,
    PendingTier3,
    Approved,
    Rejected,
    Allocated,
    Completed,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingTier1 => "pending tier 1",
            Self::PendingTier2 => "pending tier 2",
            Self::PendingTier3 => "pending tier 3",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Allocated => "allocated",
            Self::Completed => "completed",
        }
    }

    pub const fn pending(tier: ApprovalTier) -> Self {
        match tier {
            ApprovalTier::Tier1 => Self::PendingTier1,
            ApprovalTier::Tier2 => Self::PendingTier2,
            ApprovalTier::Tier3 => Self::PendingTier3,
        }
    }

    /// Tier currently holding the request, if it is still awaiting approval.
    pub const fn pending_tier(self) -> Option<ApprovalTier> {
        match self {
            Self::PendingTier1 => Some(ApprovalTier::Tier1),
            Self::PendingTier2 => Some(ApprovalTier::Tier2),
            Self::PendingTier3 => Some(ApprovalTier::Tier3),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Forward,
    Reject,
}

/// Immutable record of a single approver decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub request_id: RequestId,
    pub tier: ApprovalTier,
    pub actor_role: ApproverRole,
    pub action: ApprovalAction,
    pub comment: String,
    pub recorded_at: DateTime<Utc>,
    pub resulting_status: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRequestSubmission {
    pub department: String,
    pub applicant: String,
    pub requested_area: f64,
    pub intended_use: String,
    #[serde(default)]
    pub urgent: bool,
    pub requested_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRequest {
    pub id: RequestId,
    pub department: String,
    pub applicant: String,
    pub requested_area: f64,
    pub intended_use: String,
    pub urgent: bool,
    pub requested_on: NaiveDate,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub approvals: Vec<ApprovalEvent>,
}

impl SpaceRequest {
    pub fn from_submission(
        id: RequestId,
        submission: SpaceRequestSubmission,
        at: DateTime<Utc>,
    ) -> Result<Self, HousingError> {
        require_text(&submission.department, "department")?;
        require_text(&submission.applicant, "applicant")?;
        require_text(&submission.intended_use, "intended use")?;
        require_positive_area(submission.requested_area, "requested area")?;

        Ok(Self {
            id,
            department: submission.department.trim().to_string(),
            applicant: submission.applicant.trim().to_string(),
            requested_area: submission.requested_area,
            intended_use: submission.intended_use.trim().to_string(),
            urgent: submission.urgent,
            requested_on: submission.requested_on,
            status: RequestStatus::PendingTier1,
            submitted_at: at,
            approvals: Vec::new(),
        })
    }

    pub fn required_tier(&self) -> ApprovalTier {
        ApprovalTier::required_for(self.requested_area)
    }

    pub fn latest_event(&self) -> Option<&ApprovalEvent> {
        self.approvals.last()
    }

    /// Checks that the approval trail agrees with the current status.
    pub fn history_consistent(&self) -> bool {
        let ordered = self
            .approvals
            .windows(2)
            .all(|pair| pair[0].recorded_at <= pair[1].recorded_at);

        let expected = match self.status {
            RequestStatus::Allocated | RequestStatus::Completed => Some(RequestStatus::Approved),
            RequestStatus::PendingTier1 => None,
            other => Some(other),
        };

        let latest = self.latest_event().map(|event| event.resulting_status);
        ordered && latest == expected
    }
}
