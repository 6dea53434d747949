//! Pure occupancy classifiers for persons, rooms and departments.

mod department;
mod person;
mod room;
mod tags;

use std::sync::Arc;

pub use department::{
    classify_department, DepartmentComplianceSnapshot, DepartmentComplianceStatus,
    DepartmentOccupancy, OveragePolicy, StaffingCategory, StaffingLine,
    DEFAULT_OVERAGE_TOLERANCE,
};
pub use person::{
    classify_person, status_for, AssignedRoom, PersonComplianceSnapshot, PersonComplianceStatus,
    PersonOccupancy,
};
pub use room::{
    classify_room, labels_for, Occupant, OccupancyFacts, RoomComplianceLabel,
    RoomComplianceSnapshot, RoomOccupancyRecord, RoomOccupancySubmission,
};
pub use tags::{normalize, PersonViolation, RoomViolation, ViolationSet, ViolationTag};

use super::quota::{QuotaKey, QuotaSource};
use super::HousingError;

/// Classifier bound to a quota rule source and an overage policy.
pub struct ComplianceClassifier<Q> {
    quota: Arc<Q>,
    policy: OveragePolicy,
}

impl<Q> ComplianceClassifier<Q>
where
    Q: QuotaSource,
{
    pub fn new(quota: Arc<Q>, policy: OveragePolicy) -> Self {
        Self { quota, policy }
    }

    pub fn quota(&self) -> &Q {
        &self.quota
    }

    pub fn policy(&self) -> &OveragePolicy {
        &self.policy
    }

    pub fn classify_person(
        &self,
        occupancy: &PersonOccupancy,
    ) -> Result<PersonComplianceSnapshot, HousingError> {
        person::validate(occupancy)?;
        let quota_area = self.coefficient(QuotaKey::PersonnelRank(occupancy.rank))?;
        Ok(classify_person(occupancy, quota_area))
    }

    pub fn classify_room(
        &self,
        submission: &RoomOccupancySubmission,
    ) -> Result<RoomComplianceSnapshot, HousingError> {
        room::validate(submission)?;
        Ok(classify_room(submission))
    }

    pub fn classify_department(
        &self,
        occupancy: &DepartmentOccupancy,
    ) -> Result<DepartmentComplianceSnapshot, HousingError> {
        department::validate(occupancy)?;
        let quota_area = self.department_quota(occupancy)?;
        Ok(classify_department(occupancy, quota_area, &self.policy))
    }

    /// Summed per-person entitlement, scaled by the discipline multiplier when one is given.
    pub fn department_quota(&self, occupancy: &DepartmentOccupancy) -> Result<f64, HousingError> {
        let mut quota = 0.0;
        for line in &occupancy.staffing {
            let per_person = self.coefficient(line.category.into())?;
            quota += per_person * f64::from(line.headcount);
        }

        if let Some(discipline) = occupancy.discipline {
            quota *= self.coefficient(QuotaKey::Discipline(discipline))?;
        }

        Ok(quota)
    }

    fn coefficient(&self, key: QuotaKey) -> Result<f64, HousingError> {
        self.quota
            .coefficient(key)
            .ok_or_else(|| HousingError::not_found("quota rule", key))
    }
}
