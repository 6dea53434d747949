//! Tiered approval of space requests.

pub mod machine;
mod request;
mod tier;

pub use request::{
    ApprovalAction, ApprovalEvent, RequestStatus, SpaceRequest, SpaceRequestSubmission,
};
pub use tier::{ApprovalTier, ApproverRole, TIER2_AREA_THRESHOLD, TIER3_AREA_THRESHOLD};
