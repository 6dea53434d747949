//! Public-housing allocation workflows and the quota compliance rule engine.
//!
//! Space requests climb an area-dependent approval ladder before rooms are bound to them,
//! returned rooms flow back into the inventory through a linear return workflow, and the
//! compliance classifier labels person, room and department occupancy against quota.

pub mod allocation;
pub mod approval;
pub mod compliance;
pub mod domain;
mod error;
pub mod inventory;
pub mod memory;
pub mod quota;
pub mod repository;
pub mod returns;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use allocation::{
    AllocationCommand, AllocationRecord, AllocationType, DirectAssignment, RoomSnapshot,
};
pub use approval::{
    ApprovalAction, ApprovalEvent, ApprovalTier, ApproverRole, RequestStatus, SpaceRequest,
    SpaceRequestSubmission,
};
pub use compliance::{
    ComplianceClassifier, DepartmentComplianceSnapshot, DepartmentComplianceStatus,
    DepartmentOccupancy, Occupant, OveragePolicy, PersonComplianceSnapshot,
    PersonComplianceStatus, PersonOccupancy, PersonViolation, RoomComplianceLabel,
    RoomComplianceSnapshot, RoomOccupancyRecord, RoomOccupancySubmission, RoomViolation,
    StaffingCategory, StaffingLine, ViolationSet,
};
pub use domain::{
    AllocationId, Assignee, Clock, RequestId, ReturnId, RoomId, SystemClock,
};
pub use error::HousingError;
pub use inventory::{Availability, Room, RoomRegistration};
pub use memory::{HousingSnapshot, InMemoryHousingStore};
pub use quota::{
    Discipline, PersonnelRank, QuotaKey, QuotaRule, QuotaRuleTable, QuotaSource, StudentLevel,
};
pub use repository::{
    AllocationLedger, HousingStore, OccupancyRepository, RepositoryError, ReturnRepository,
    RoomClaimError, RoomRepository, SpaceRequestRepository,
};
pub use returns::{ReturnRequest, ReturnStatus, ReturnSubmission};
pub use router::housing_router;
pub use service::{
    AllocationOutcome, BatchApprovalReport, BatchSkip, DirectAssignmentOutcome,
    HousingService, ReturnCompletion,
};
