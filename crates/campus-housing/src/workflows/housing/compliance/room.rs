use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tags::{RoomViolation, ViolationSet};
use crate::workflows::housing::domain::require_text;
use crate::workflows::housing::HousingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomComplianceLabel {
    FullyCompliant,
    OverCapacity,
    PartiallyUnauthorized,
    UnauthorizedShared,
}

impl RoomComplianceLabel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullyCompliant => "fully compliant",
            Self::OverCapacity => "over capacity",
            Self::PartiallyUnauthorized => "partially unauthorized",
            Self::UnauthorizedShared => "unauthorized shared use",
        }
    }

    fn from_violation(tag: RoomViolation) -> Option<Self> {
        match tag {
            RoomViolation::None => None,
            RoomViolation::OverCapacityOccupancy => Some(Self::OverCapacity),
            RoomViolation::PartiallyUnauthorizedOccupants => Some(Self::PartiallyUnauthorized),
            RoomViolation::UnauthorizedSharedUse => Some(Self::UnauthorizedShared),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub subject_id: String,
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub duty_scope: String,
    pub registered: bool,
}

/// One-room-multiple-occupants form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupancySubmission {
    pub room_code: String,
    pub approved_capacity: u32,
    pub occupants: Vec<Occupant>,
    #[serde(default)]
    pub violations: Vec<RoomViolation>,
}

/// Facts derived from the occupant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyFacts {
    pub actual_count: usize,
    pub all_unregistered: bool,
    pub cross_department: bool,
    pub unauthorized_shared: bool,
}

impl OccupancyFacts {
    pub fn derive(occupants: &[Occupant]) -> Self {
        let actual_count = occupants.len();
        let all_unregistered =
            actual_count > 0 && occupants.iter().all(|occupant| !occupant.registered);
        let departments: HashSet<&str> = occupants
            .iter()
            .map(|occupant| occupant.department.trim())
            .collect();
        let cross_department = departments.len() > 1;

        Self {
            actual_count,
            all_unregistered,
            cross_department,
            unauthorized_shared: all_unregistered || cross_department,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomComplianceSnapshot {
    pub room_code: String,
    pub approved_capacity: u32,
    pub facts: OccupancyFacts,
    pub violations: ViolationSet<RoomViolation>,
    pub labels: BTreeSet<RoomComplianceLabel>,
}

/// Declared tags plus the capacity and shared-use labels forced by the facts.
pub fn labels_for(
    approved_capacity: u32,
    facts: &OccupancyFacts,
    violations: &ViolationSet<RoomViolation>,
) -> BTreeSet<RoomComplianceLabel> {
    let mut labels: BTreeSet<RoomComplianceLabel> = violations
        .iter()
        .filter_map(RoomComplianceLabel::from_violation)
        .collect();

    if facts.actual_count > approved_capacity as usize {
        labels.insert(RoomComplianceLabel::OverCapacity);
    }
    if facts.unauthorized_shared {
        labels.insert(RoomComplianceLabel::UnauthorizedShared);
    }

    if labels.is_empty() {
        labels.insert(RoomComplianceLabel::FullyCompliant);
    } else if labels.len() > 1 {
        labels.remove(&RoomComplianceLabel::FullyCompliant);
    }
    labels
}

pub fn classify_room(submission: &RoomOccupancySubmission) -> RoomComplianceSnapshot {
    let violations = ViolationSet::normalized(submission.violations.iter().copied());
    snapshot(
        &submission.room_code,
        submission.approved_capacity,
        &submission.occupants,
        violations,
    )
}

fn snapshot(
    room_code: &str,
    approved_capacity: u32,
    occupants: &[Occupant],
    violations: ViolationSet<RoomViolation>,
) -> RoomComplianceSnapshot {
    let facts = OccupancyFacts::derive(occupants);
    RoomComplianceSnapshot {
        room_code: room_code.to_string(),
        approved_capacity,
        labels: labels_for(approved_capacity, &facts, &violations),
        facts,
        violations,
    }
}

pub(crate) fn validate(submission: &RoomOccupancySubmission) -> Result<(), HousingError> {
    require_text(&submission.room_code, "room code")?;
    for occupant in &submission.occupants {
        require_text(&occupant.subject_id, "occupant subject id")?;
        require_text(&occupant.name, "occupant name")?;
        require_text(&occupant.department, "occupant department")?;
    }
    Ok(())
}

/// Registered occupancy facts for a room code; labels are always recomputed from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomOccupancyRecord {
    pub room_code: String,
    pub approved_capacity: u32,
    pub occupants: Vec<Occupant>,
    pub violations: ViolationSet<RoomViolation>,
    pub updated_at: DateTime<Utc>,
}

impl RoomOccupancyRecord {
    pub fn from_submission(submission: RoomOccupancySubmission, at: DateTime<Utc>) -> Self {
        let violations = ViolationSet::normalized(submission.violations.iter().copied());
        Self {
            room_code: submission.room_code,
            approved_capacity: submission.approved_capacity,
            occupants: dedup_occupants(submission.occupants),
            violations,
            updated_at: at,
        }
    }

    pub fn classify(&self) -> RoomComplianceSnapshot {
        snapshot(
            &self.room_code,
            self.approved_capacity,
            &self.occupants,
            self.violations.clone(),
        )
    }

    /// Folds a repeated submission for the same room code into this record.
    ///
    /// Occupants are deduplicated by subject id and name (first entry wins), violation tags
    /// are unioned, and the incoming approved capacity replaces the stored one.
    pub fn merge(self, incoming: RoomOccupancySubmission, at: DateTime<Utc>) -> Self {
        let incoming_tags = ViolationSet::normalized(incoming.violations.iter().copied());
        let mut occupants = self.occupants;
        occupants.extend(incoming.occupants);

        Self {
            room_code: self.room_code,
            approved_capacity: incoming.approved_capacity,
            occupants: dedup_occupants(occupants),
            violations: self.violations.union(&incoming_tags),
            updated_at: at,
        }
    }
}

fn dedup_occupants(occupants: Vec<Occupant>) -> Vec<Occupant> {
    let mut seen = HashSet::new();
    occupants
        .into_iter()
        .filter(|occupant| {
            seen.insert((
                occupant.subject_id.trim().to_string(),
                occupant.name.trim().to_string(),
            ))
        })
        .collect()
}
