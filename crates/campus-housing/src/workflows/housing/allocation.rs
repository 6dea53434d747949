use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{next_allocation_id, require_text, AllocationId, Assignee, RequestId, RoomId};
use super::inventory::Room;
use super::HousingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationType {
    New,
    Transfer,
    Return,
    Adjust,
}

impl AllocationType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Transfer => "transfer",
            Self::Return => "return",
            Self::Adjust => "adjust",
        }
    }
}

/// Room facts frozen at the moment of the ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub building: String,
    pub area: f64,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id.clone(),
            building: room.building.clone(),
            area: room.area,
        }
    }
}

/// Append-only ledger entry. Corrections are recorded as new entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub id: AllocationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub room: RoomSnapshot,
    pub source: Option<Assignee>,
    /// Empty for returns, where the room goes back to the pool.
    pub destination: Option<Assignee>,
    pub allocation_type: AllocationType,
    pub effective_at: DateTime<Utc>,
    pub operator: String,
    #[serde(default)]
    pub note: String,
}

pub(crate) struct LedgerEntry<'a> {
    pub(crate) request_id: Option<RequestId>,
    pub(crate) room: &'a Room,
    pub(crate) source: Option<Assignee>,
    pub(crate) destination: Option<Assignee>,
    pub(crate) allocation_type: AllocationType,
    pub(crate) operator: &'a str,
    pub(crate) note: &'a str,
}

impl LedgerEntry<'_> {
    pub(crate) fn record(self, at: DateTime<Utc>) -> AllocationRecord {
        AllocationRecord {
            id: next_allocation_id(),
            request_id: self.request_id,
            room: RoomSnapshot::from(self.room),
            source: self.source,
            destination: self.destination,
            allocation_type: self.allocation_type,
            effective_at: at,
            operator: self.operator.trim().to_string(),
            note: self.note.trim().to_string(),
        }
    }
}

/// Operator selection of rooms for an approved request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationCommand {
    pub room_ids: Vec<RoomId>,
    pub operator: String,
    #[serde(default)]
    pub note: String,
}

impl AllocationCommand {
    pub fn validate(&self) -> Result<(), HousingError> {
        require_text(&self.operator, "operator")?;
        if self.room_ids.is_empty() {
            return Err(HousingError::Validation(
                "at least one room must be selected".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for room_id in &self.room_ids {
            require_text(room_id.as_str(), "room id")?;
            if !seen.insert(room_id) {
                return Err(HousingError::Validation(format!(
                    "room {room_id} selected more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Administrator assignment that bypasses the request workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectAssignment {
    pub assignee: Assignee,
    pub operator: String,
    #[serde(default)]
    pub note: String,
}

impl DirectAssignment {
    pub fn validate(&self) -> Result<(), HousingError> {
        require_text(self.assignee.name(), "assignee name")?;
        require_text(&self.operator, "operator")
    }
}

/// Ledger type for a direct assignment given the room's previous holder.
pub fn direct_assignment_type(previous: Option<&Assignee>, next: &Assignee) -> AllocationType {
    match previous {
        None => AllocationType::New,
        Some(current) if current == next => AllocationType::Adjust,
        Some(_) => AllocationType::Transfer,
    }
}
