use serde::{Deserialize, Serialize};

use super::tags::{PersonViolation, ViolationSet};
use crate::workflows::housing::domain::{require_positive_area, require_text, RoomId};
use crate::workflows::housing::quota::PersonnelRank;
use crate::workflows::housing::HousingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonComplianceStatus {
    FullyCompliant,
    PartialViolation,
    FullViolation,
}

impl PersonComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullyCompliant => "fully compliant",
            Self::PartialViolation => "partial violation",
            Self::FullViolation => "full violation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedRoom {
    pub room_id: RoomId,
    pub area: f64,
}

/// One-person-multiple-rooms facts for a single occupant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonOccupancy {
    pub person_id: String,
    pub name: String,
    pub rank: PersonnelRank,
    pub rooms: Vec<AssignedRoom>,
    #[serde(default)]
    pub violations: Vec<PersonViolation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonComplianceSnapshot {
    pub person_id: String,
    pub name: String,
    pub rank: PersonnelRank,
    pub quota_area: f64,
    pub actual_area: f64,
    pub room_count: usize,
    /// Area held beyond the rank quota, zero when within it.
    pub excess_area: f64,
    pub violations: ViolationSet<PersonViolation>,
    pub status: PersonComplianceStatus,
}

/// Status is ordered by the number of declared violations, not by which ones.
pub fn status_for(violations: &ViolationSet<PersonViolation>) -> PersonComplianceStatus {
    match violations.violation_count() {
        0 => PersonComplianceStatus::FullyCompliant,
        1 => PersonComplianceStatus::PartialViolation,
        _ => PersonComplianceStatus::FullViolation,
    }
}

pub(crate) fn validate(occupancy: &PersonOccupancy) -> Result<(), HousingError> {
    require_text(&occupancy.person_id, "person id")?;
    require_text(&occupancy.name, "person name")?;
    for room in &occupancy.rooms {
        require_text(room.room_id.as_str(), "room id")?;
        require_positive_area(room.area, "room area")?;
    }
    Ok(())
}

pub fn classify_person(occupancy: &PersonOccupancy, quota_area: f64) -> PersonComplianceSnapshot {
    let violations = ViolationSet::normalized(occupancy.violations.iter().copied());
    let actual_area: f64 = occupancy.rooms.iter().map(|room| room.area).sum();

    PersonComplianceSnapshot {
        person_id: occupancy.person_id.clone(),
        name: occupancy.name.clone(),
        rank: occupancy.rank,
        quota_area,
        actual_area,
        room_count: occupancy.rooms.len(),
        excess_area: (actual_area - quota_area).max(0.0),
        status: status_for(&violations),
        violations,
    }
}
