use chrono::{DateTime, Utc};

use super::allocation::AllocationRecord;
use super::approval::{RequestStatus, SpaceRequest};
use super::compliance::{RoomOccupancyRecord, RoomOccupancySubmission};
use super::domain::{Assignee, RequestId, ReturnId, RoomId};
use super::inventory::{Availability, Room};
use super::returns::{ReturnRequest, ReturnStatus};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the atomic room check-and-set used by allocation.
#[derive(Debug, thiserror::Error)]
pub enum RoomClaimError {
    #[error("room {0} not found")]
    NotFound(RoomId),
    #[error("room {room_id} is {state}", state = .availability.label())]
    Unavailable {
        room_id: RoomId,
        availability: Availability,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub trait SpaceRequestRepository: Send + Sync {
    fn insert_request(&self, request: SpaceRequest) -> Result<SpaceRequest, RepositoryError>;
    fn fetch_request(&self, id: &RequestId) -> Result<Option<SpaceRequest>, RepositoryError>;
    /// Replaces the stored request only while its status still equals `expected`.
    fn update_request(
        &self,
        request: SpaceRequest,
        expected: RequestStatus,
    ) -> Result<(), RepositoryError>;
    fn list_requests(&self) -> Result<Vec<SpaceRequest>, RepositoryError>;
}

pub trait RoomRepository: Send + Sync {
    fn insert_room(&self, room: Room) -> Result<Room, RepositoryError>;
    fn fetch_room(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError>;
    fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError>;
    /// Replaces the stored room only while its availability still equals `expected`.
    fn update_room(&self, room: Room, expected: Availability) -> Result<(), RepositoryError>;
    /// Test-and-set: occupies every listed room for `assignee` if all are available, otherwise
    /// changes nothing. Returns the rooms as they were before the claim.
    fn claim_rooms(&self, ids: &[RoomId], assignee: &Assignee) -> Result<Vec<Room>, RoomClaimError>;
    /// Puts back rooms returned by a claim whose follow-up step failed.
    fn restore_rooms(&self, rooms: Vec<Room>) -> Result<(), RepositoryError>;
}

pub trait AllocationLedger: Send + Sync {
    fn append_allocation(&self, record: AllocationRecord)
        -> Result<AllocationRecord, RepositoryError>;
    /// Appends every record or none of them.
    fn append_allocations(
        &self,
        records: Vec<AllocationRecord>,
    ) -> Result<Vec<AllocationRecord>, RepositoryError>;
    fn list_allocations(&self) -> Result<Vec<AllocationRecord>, RepositoryError>;
}

pub trait ReturnRepository: Send + Sync {
    fn insert_return(&self, request: ReturnRequest) -> Result<ReturnRequest, RepositoryError>;
    fn fetch_return(&self, id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError>;
    /// Replaces the stored return only while its status still equals `expected`.
    fn update_return(
        &self,
        request: ReturnRequest,
        expected: ReturnStatus,
    ) -> Result<(), RepositoryError>;
    fn list_returns(&self) -> Result<Vec<ReturnRequest>, RepositoryError>;
}

pub trait OccupancyRepository: Send + Sync {
    fn fetch_occupancy(&self, room_code: &str)
        -> Result<Option<RoomOccupancyRecord>, RepositoryError>;
    /// Creates the record for the submission's room code, or merges into the existing one,
    /// as a single step.
    fn upsert_occupancy(
        &self,
        submission: RoomOccupancySubmission,
        at: DateTime<Utc>,
    ) -> Result<RoomOccupancyRecord, RepositoryError>;
    fn list_occupancy(&self) -> Result<Vec<RoomOccupancyRecord>, RepositoryError>;
}

/// Every aggregate store the housing service depends on.
pub trait HousingStore:
    SpaceRequestRepository + RoomRepository + AllocationLedger + ReturnRepository + OccupancyRepository
{
}

impl<T> HousingStore for T where
    T: SpaceRequestRepository
        + RoomRepository
        + AllocationLedger
        + ReturnRepository
        + OccupancyRepository
{
}
