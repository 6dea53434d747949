use serde::{Deserialize, Serialize};

use crate::workflows::housing::domain::require_text;
use crate::workflows::housing::quota::{Discipline, PersonnelRank, QuotaKey, StudentLevel};
use crate::workflows::housing::HousingError;

/// Share of quota tolerated before an overage is considered severe.
pub const DEFAULT_OVERAGE_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentComplianceStatus {
    FullyCompliant,
    PartialOverage,
    SevereOverage,
}

impl DepartmentComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullyCompliant => "fully compliant",
            Self::PartialOverage => "partial overage",
            Self::SevereOverage => "severe overage",
        }
    }
}

/// Headcount categories that carry a per-person area coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", content = "key", rename_all = "snake_case")]
pub enum StaffingCategory {
    PersonnelRank(PersonnelRank),
    StudentLevel(StudentLevel),
}

impl From<StaffingCategory> for QuotaKey {
    fn from(value: StaffingCategory) -> Self {
        match value {
            StaffingCategory::PersonnelRank(rank) => QuotaKey::PersonnelRank(rank),
            StaffingCategory::StudentLevel(level) => QuotaKey::StudentLevel(level),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaffingLine {
    #[serde(flatten)]
    pub category: StaffingCategory,
    pub headcount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentOccupancy {
    pub department: String,
    pub staffing: Vec<StaffingLine>,
    #[serde(default)]
    pub discipline: Option<Discipline>,
    pub actual_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentComplianceSnapshot {
    pub department: String,
    pub quota_area: f64,
    pub actual_area: f64,
    pub excess_area: f64,
    /// Excess as a share of quota; absent when the quota is zero.
    pub excess_ratio: Option<f64>,
    pub status: DepartmentComplianceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OveragePolicy {
    tolerance: f64,
}

impl OveragePolicy {
    pub fn new(tolerance: f64) -> Self {
        let sanitized = if tolerance.is_finite() && tolerance > 0.0 && tolerance < 1.0 {
            tolerance
        } else {
            DEFAULT_OVERAGE_TOLERANCE
        };

        Self {
            tolerance: sanitized,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn status(&self, quota_area: f64, actual_area: f64) -> DepartmentComplianceStatus {
        if actual_area <= quota_area {
            return DepartmentComplianceStatus::FullyCompliant;
        }

        let excess = actual_area - quota_area;
        if excess <= quota_area * self.tolerance + f64::EPSILON * quota_area.abs().max(1.0) {
            DepartmentComplianceStatus::PartialOverage
        } else {
            DepartmentComplianceStatus::SevereOverage
        }
    }
}

impl Default for OveragePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OVERAGE_TOLERANCE)
    }
}

pub(crate) fn validate(occupancy: &DepartmentOccupancy) -> Result<(), HousingError> {
    require_text(&occupancy.department, "department")?;
    if !(occupancy.actual_area.is_finite() && occupancy.actual_area >= 0.0) {
        return Err(HousingError::Validation(format!(
            "actual area must be a non-negative number (found {})",
            occupancy.actual_area
        )));
    }
    Ok(())
}

pub fn classify_department(
    occupancy: &DepartmentOccupancy,
    quota_area: f64,
    policy: &OveragePolicy,
) -> DepartmentComplianceSnapshot {
    let excess_area = (occupancy.actual_area - quota_area).max(0.0);
    let excess_ratio = if quota_area > 0.0 {
        Some(excess_area / quota_area)
    } else {
        None
    };

    DepartmentComplianceSnapshot {
        department: occupancy.department.clone(),
        quota_area,
        actual_area: occupancy.actual_area,
        excess_area,
        excess_ratio,
        status: policy.status(quota_area, occupancy.actual_area),
    }
}
