//! Linear return workflow: `Pending -> Approved -> Completed`.
//!
//! Returns cannot be refused once submitted; there is no rejection path.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{require_text, ReturnId, RoomId};
use super::inventory::{Availability, Room};
use super::HousingError;

const ENTITY: &str = "return request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Completed,
}

impl ReturnStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSubmission {
    pub department: String,
    pub room_id: RoomId,
    pub reason: String,
    #[serde(default)]
    pub expected_on: Option<NaiveDate>,
}

impl ReturnSubmission {
    pub fn validate(&self) -> Result<(), HousingError> {
        require_text(&self.department, "department")?;
        require_text(self.room_id.as_str(), "room reference")?;
        require_text(&self.reason, "return reason")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: ReturnId,
    pub department: String,
    pub room_id: RoomId,
    pub area: f64,
    pub reason: String,
    pub status: ReturnStatus,
    #[serde(default)]
    pub expected_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReturnRequest {
    pub fn is_open(&self) -> bool {
        self.status != ReturnStatus::Completed
    }
}

/// Opens a return for a room the submitting department currently holds.
pub fn open(
    id: ReturnId,
    submission: ReturnSubmission,
    room: &Room,
    at: DateTime<Utc>,
) -> Result<ReturnRequest, HousingError> {
    submission.validate()?;

    let held = room
        .assignee
        .as_ref()
        .map(|assignee| assignee.is_held_by(&submission.department))
        .unwrap_or(false);
    if !held {
        return Err(HousingError::Validation(format!(
            "room {} is not held by {}",
            room.id,
            submission.department.trim()
        )));
    }

    Ok(ReturnRequest {
        id,
        department: submission.department.trim().to_string(),
        room_id: room.id.clone(),
        area: room.area,
        reason: submission.reason.trim().to_string(),
        status: ReturnStatus::Pending,
        expected_on: submission.expected_on,
        created_at: at,
        approved_at: None,
        completed_at: None,
    })
}

fn invalid(request: &ReturnRequest, operation: &'static str) -> HousingError {
    HousingError::InvalidStateTransition {
        entity: ENTITY,
        id: request.id.to_string(),
        state: request.status.label().to_string(),
        operation,
    }
}

fn already_completed(request: &ReturnRequest) -> HousingError {
    HousingError::AlreadyCompleted {
        entity: ENTITY,
        id: request.id.to_string(),
    }
}

pub fn approve(request: &ReturnRequest, at: DateTime<Utc>) -> Result<ReturnRequest, HousingError> {
    match request.status {
        ReturnStatus::Pending => {
            let mut next = request.clone();
            next.status = ReturnStatus::Approved;
            next.approved_at = Some(at);
            Ok(next)
        }
        ReturnStatus::Approved => Err(invalid(request, "approve")),
        ReturnStatus::Completed => Err(already_completed(request)),
    }
}

pub fn complete(request: &ReturnRequest, at: DateTime<Utc>) -> Result<ReturnRequest, HousingError> {
    match request.status {
        ReturnStatus::Approved => {
            let mut next = request.clone();
            next.status = ReturnStatus::Completed;
            next.completed_at = Some(at);
            Ok(next)
        }
        ReturnStatus::Pending => Err(invalid(request, "complete")),
        ReturnStatus::Completed => Err(already_completed(request)),
    }
}

/// The room must still be occupied by the returning department when the return completes.
pub fn ensure_returnable(request: &ReturnRequest, room: &Room) -> Result<(), HousingError> {
    let holder = room
        .assignee
        .as_ref()
        .filter(|assignee| assignee.is_held_by(&request.department));

    match (room.availability, holder) {
        (Availability::Occupied, Some(_)) => Ok(()),
        (Availability::Occupied, None) => Err(HousingError::InvalidStateTransition {
            entity: "room",
            id: room.id.to_string(),
            state: match &room.assignee {
                Some(assignee) => format!("held by {assignee}"),
                None => "unassigned".to_string(),
            },
            operation: "return",
        }),
        (availability, _) => Err(HousingError::InvalidStateTransition {
            entity: "room",
            id: room.id.to_string(),
            state: availability.label().to_string(),
            operation: "return",
        }),
    }
}
