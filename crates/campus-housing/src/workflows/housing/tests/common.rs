use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::housing::compliance::{RoomOccupancyRecord, RoomOccupancySubmission};
use crate::workflows::housing::{
    housing_router, AllocationLedger, AllocationRecord, ApproverRole, Assignee, Availability,
    Clock, HousingService, InMemoryHousingStore, OccupancyRepository, OveragePolicy,
    QuotaRuleTable, RepositoryError, RequestId, RequestStatus, ReturnId, ReturnRepository,
    ReturnRequest, ReturnStatus, Room, RoomClaimError, RoomId, RoomRegistration, RoomRepository,
    SpaceRequest, SpaceRequestRepository, SpaceRequestSubmission,
};

pub(super) type MemoryService = HousingService<InMemoryHousingStore, QuotaRuleTable>;

/// Clock that only moves when a test advances it.
pub(super) struct FixedClock {
    start: DateTime<Utc>,
    offset_minutes: AtomicI64,
}

impl FixedClock {
    pub(super) fn new() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2025, 9, 1, 8, 30, 0)
                .single()
                .expect("valid start"),
            offset_minutes: AtomicI64::new(0),
        }
    }

    pub(super) fn advance(&self, minutes: i64) {
        self.offset_minutes.fetch_add(minutes, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.offset_minutes.load(Ordering::SeqCst))
    }
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryHousingStore>, Arc<FixedClock>) {
    let store = Arc::new(InMemoryHousingStore::default());
    let clock = Arc::new(FixedClock::new());
    let service = HousingService::new(
        store.clone(),
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    )
    .with_clock(clock.clone());
    (service, store, clock)
}

pub(super) fn request_submission(area: f64) -> SpaceRequestSubmission {
    SpaceRequestSubmission {
        department: "School of Materials".to_string(),
        applicant: "Chen Jie".to_string(),
        requested_area: area,
        intended_use: "research laboratory".to_string(),
        urgent: false,
        requested_on: NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date"),
    }
}

pub(super) fn room_registration(id: &str, area: f64) -> RoomRegistration {
    RoomRegistration {
        id: RoomId::from(id),
        building: "Engineering Hall".to_string(),
        floor: 3,
        area,
        use_type: "laboratory".to_string(),
        availability: Availability::Available,
        assignee: None,
    }
}

/// Walks a request up the approval ladder until it is approved.
pub(super) fn approved_request(service: &MemoryService, area: f64) -> SpaceRequest {
    let request = service
        .submit_request(request_submission(area))
        .expect("submission accepted");
    let mut current = request;
    while let Some(tier) = current.status.pending_tier() {
        current = service
            .approve(&current.id, tier.designated_role(), "approved")
            .expect("designated approver approves");
    }
    assert_eq!(current.status, RequestStatus::Approved);
    current
}

pub(super) fn register_rooms(service: &MemoryService, ids: &[&str]) -> Vec<RoomId> {
    ids.iter()
        .map(|id| {
            service
                .register_room(room_registration(id, 40.0))
                .expect("room registers")
                .id
        })
        .collect()
}

pub(super) const ALL_ROLES: [ApproverRole; 3] = [
    ApproverRole::DelegatedVicePresident,
    ApproverRole::HousingLeadershipGroup,
    ApproverRole::PresidentsOffice,
];

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    housing_router(Arc::new(service))
}

/// Store whose every call fails as if the backing database were down.
pub(super) struct UnavailableStore;

fn down() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl SpaceRequestRepository for UnavailableStore {
    fn insert_request(&self, _request: SpaceRequest) -> Result<SpaceRequest, RepositoryError> {
        Err(down())
    }

    fn fetch_request(&self, _id: &RequestId) -> Result<Option<SpaceRequest>, RepositoryError> {
        Err(down())
    }

    fn update_request(
        &self,
        _request: SpaceRequest,
        _expected: RequestStatus,
    ) -> Result<(), RepositoryError> {
        Err(down())
    }

    fn list_requests(&self) -> Result<Vec<SpaceRequest>, RepositoryError> {
        Err(down())
    }
}

impl RoomRepository for UnavailableStore {
    fn insert_room(&self, _room: Room) -> Result<Room, RepositoryError> {
        Err(down())
    }

    fn fetch_room(&self, _id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        Err(down())
    }

    fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        Err(down())
    }

    fn update_room(&self, _room: Room, _expected: Availability) -> Result<(), RepositoryError> {
        Err(down())
    }

    fn claim_rooms(
        &self,
        _ids: &[RoomId],
        _assignee: &Assignee,
    ) -> Result<Vec<Room>, RoomClaimError> {
        Err(RoomClaimError::Repository(down()))
    }

    fn restore_rooms(&self, _rooms: Vec<Room>) -> Result<(), RepositoryError> {
        Err(down())
    }
}

impl AllocationLedger for UnavailableStore {
    fn append_allocation(
        &self,
        _record: AllocationRecord,
    ) -> Result<AllocationRecord, RepositoryError> {
        Err(down())
    }

    fn append_allocations(
        &self,
        _records: Vec<AllocationRecord>,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Err(down())
    }

    fn list_allocations(&self) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Err(down())
    }
}

impl ReturnRepository for UnavailableStore {
    fn insert_return(&self, _request: ReturnRequest) -> Result<ReturnRequest, RepositoryError> {
        Err(down())
    }

    fn fetch_return(&self, _id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError> {
        Err(down())
    }

    fn update_return(
        &self,
        _request: ReturnRequest,
        _expected: ReturnStatus,
    ) -> Result<(), RepositoryError> {
        Err(down())
    }

    fn list_returns(&self) -> Result<Vec<ReturnRequest>, RepositoryError> {
        Err(down())
    }
}

impl OccupancyRepository for UnavailableStore {
    fn fetch_occupancy(
        &self,
        _room_code: &str,
    ) -> Result<Option<RoomOccupancyRecord>, RepositoryError> {
        Err(down())
    }

    fn upsert_occupancy(
        &self,
        _submission: RoomOccupancySubmission,
        _at: DateTime<Utc>,
    ) -> Result<RoomOccupancyRecord, RepositoryError> {
        Err(down())
    }

    fn list_occupancy(&self) -> Result<Vec<RoomOccupancyRecord>, RepositoryError> {
        Err(down())
    }
}

pub(super) fn unavailable_service() -> HousingService<UnavailableStore, QuotaRuleTable> {
    HousingService::new(
        Arc::new(UnavailableStore),
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    )
}
