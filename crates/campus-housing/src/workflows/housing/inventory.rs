use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{require_positive_area, require_text, Assignee, RoomId};
use super::HousingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Occupied,
    Reserved,
    Maintenance,
    PendingVacate,
}

impl Availability {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Reserved => "reserved",
            Self::Maintenance => "maintenance",
            Self::PendingVacate => "pending vacate",
        }
    }

    /// States in which a room must name its holder.
    pub const fn requires_assignee(self) -> bool {
        matches!(self, Self::Occupied | Self::Reserved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub building: String,
    pub floor: i16,
    pub area: f64,
    pub use_type: String,
    pub availability: Availability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_start: Option<DateTime<Utc>>,
}

impl Room {
    /// Holder is present exactly when the state requires one.
    pub fn is_consistent(&self) -> bool {
        self.availability.requires_assignee() == self.assignee.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    pub(crate) fn occupy(&mut self, assignee: Assignee) {
        self.availability = Availability::Occupied;
        self.assignee = Some(assignee);
        self.vacancy_start = None;
    }

    pub(crate) fn vacate(&mut self, at: DateTime<Utc>) {
        self.availability = Availability::Available;
        self.assignee = None;
        self.vacancy_start = Some(at);
    }

    /// Whole days since the room became available.
    pub fn idle_days(&self, today: DateTime<Utc>) -> Option<i64> {
        if !self.is_available() {
            return None;
        }
        self.vacancy_start
            .map(|start| (today - start).num_days().max(0))
    }
}

/// Inventory-management payload creating a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRegistration {
    pub id: RoomId,
    pub building: String,
    pub floor: i16,
    pub area: f64,
    pub use_type: String,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub assignee: Option<Assignee>,
}

impl RoomRegistration {
    pub fn into_room(self, at: DateTime<Utc>) -> Result<Room, HousingError> {
        require_text(self.id.as_str(), "room id")?;
        require_text(&self.building, "building")?;
        require_text(&self.use_type, "use type")?;
        require_positive_area(self.area, "room area")?;
        if let Some(assignee) = &self.assignee {
            require_text(assignee.name(), "assignee name")?;
        }

        let room = Room {
            vacancy_start: (self.availability == Availability::Available).then_some(at),
            id: self.id,
            building: self.building,
            floor: self.floor,
            area: self.area,
            use_type: self.use_type,
            availability: self.availability,
            assignee: self.assignee,
        };

        if !room.is_consistent() {
            return Err(HousingError::Validation(format!(
                "room {} is {} but {}",
                room.id,
                room.availability.label(),
                if room.assignee.is_some() {
                    "names an assignee"
                } else {
                    "has no assignee"
                }
            )));
        }

        Ok(room)
    }
}
