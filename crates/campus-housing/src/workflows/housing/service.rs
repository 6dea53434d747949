use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::allocation::{
    direct_assignment_type, AllocationCommand, AllocationRecord, AllocationType,
    DirectAssignment, LedgerEntry,
};
use super::approval::{machine, ApproverRole, RequestStatus, SpaceRequest, SpaceRequestSubmission};
use super::compliance::{
    ComplianceClassifier, DepartmentComplianceSnapshot, DepartmentOccupancy, OveragePolicy,
    PersonComplianceSnapshot, PersonOccupancy, RoomComplianceSnapshot, RoomOccupancyRecord,
    RoomOccupancySubmission,
};
use super::domain::{
    next_request_id, next_return_id, Assignee, Clock, RequestId, ReturnId, RoomId, SystemClock,
};
use super::inventory::{Availability, Room, RoomRegistration};
use super::quota::{QuotaRule, QuotaSource};
use super::repository::{HousingStore, RepositoryError};
use super::returns::{self, ReturnRequest, ReturnStatus, ReturnSubmission};
use super::HousingError;

const REQUEST: &str = "space request";
const RETURN: &str = "return request";

/// Rooms bound to a request by a successful allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationOutcome {
    pub request: SpaceRequest,
    pub rooms: Vec<Room>,
    pub records: Vec<AllocationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectAssignmentOutcome {
    pub room: Room,
    pub record: AllocationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnCompletion {
    pub request: ReturnRequest,
    pub room: Room,
    pub record: AllocationRecord,
}

/// Member of a batch approval that did not transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSkip {
    pub request_id: RequestId,
    pub code: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchApprovalReport {
    pub transitioned: Vec<SpaceRequest>,
    pub skipped: Vec<BatchSkip>,
}

/// Service composing the housing store, quota-backed classifier, and state machines.
pub struct HousingService<S, Q> {
    store: Arc<S>,
    classifier: ComplianceClassifier<Q>,
    clock: Arc<dyn Clock>,
}

impl<S, Q> HousingService<S, Q>
where
    S: HousingStore + 'static,
    Q: QuotaSource + 'static,
{
    pub fn new(store: Arc<S>, quota: Arc<Q>, policy: OveragePolicy) -> Self {
        Self {
            store,
            classifier: ComplianceClassifier::new(quota, policy),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn classifier(&self) -> &ComplianceClassifier<Q> {
        &self.classifier
    }

    // ---- approval ----

    pub fn submit_request(
        &self,
        submission: SpaceRequestSubmission,
    ) -> Result<SpaceRequest, HousingError> {
        let request = SpaceRequest::from_submission(next_request_id(), submission, self.clock.now())
            .inspect_err(|error| warn!(code = error.code(), %error, "space request refused"))?;
        let stored = self.store.insert_request(request)?;

        info!(
            request_id = %stored.id,
            department = %stored.department,
            area = stored.requested_area,
            required_tier = stored.required_tier().label(),
            "space request submitted"
        );
        Ok(stored)
    }

    pub fn get_request(&self, id: &RequestId) -> Result<SpaceRequest, HousingError> {
        self.store
            .fetch_request(id)?
            .ok_or_else(|| HousingError::not_found(REQUEST, id))
    }

    pub fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<SpaceRequest>, HousingError> {
        let mut requests = self.store.list_requests()?;
        if let Some(status) = status {
            requests.retain(|request| request.status == status);
        }
        Ok(requests)
    }

    pub fn approve(
        &self,
        id: &RequestId,
        role: ApproverRole,
        comment: &str,
    ) -> Result<SpaceRequest, HousingError> {
        let current = self.get_request(id)?;
        let next = machine::approve(&current, role, comment, self.clock.now())
            .inspect_err(|error| refused(id, "approve", error))?;
        let saved = self.save_request(next, current.status, "approve")?;

        info!(
            request_id = %saved.id,
            role = role.label(),
            from = current.status.label(),
            to = saved.status.label(),
            "space request approval recorded"
        );
        Ok(saved)
    }

    pub fn reject(
        &self,
        id: &RequestId,
        role: ApproverRole,
        reason: &str,
    ) -> Result<SpaceRequest, HousingError> {
        let current = self.get_request(id)?;
        let next = machine::reject(&current, role, reason, self.clock.now())
            .inspect_err(|error| refused(id, "reject", error))?;
        let saved = self.save_request(next, current.status, "reject")?;

        info!(
            request_id = %saved.id,
            role = role.label(),
            from = current.status.label(),
            "space request rejected"
        );
        Ok(saved)
    }

    /// Approves every listed request independently; failures are reported, never fatal.
    pub fn batch_approve(
        &self,
        ids: &[RequestId],
        role: ApproverRole,
        comment: &str,
    ) -> BatchApprovalReport {
        let mut report = BatchApprovalReport::default();
        for id in ids {
            match self.approve(id, role, comment) {
                Ok(request) => report.transitioned.push(request),
                Err(error) => report.skipped.push(BatchSkip {
                    request_id: id.clone(),
                    code: error.code(),
                    reason: error.to_string(),
                }),
            }
        }

        info!(
            role = role.label(),
            transitioned = report.transitioned.len(),
            skipped = report.skipped.len(),
            "batch approval processed"
        );
        report
    }

    // ---- allocation ----

    /// Binds operator-selected rooms to an approved request. All or nothing.
    pub fn allocate(
        &self,
        id: &RequestId,
        command: AllocationCommand,
    ) -> Result<AllocationOutcome, HousingError> {
        let current = self.get_request(id)?;
        command
            .validate()
            .inspect_err(|error| refused(id, "allocate", error))?;
        let allocated =
            machine::mark_allocated(&current).inspect_err(|error| refused(id, "allocate", error))?;

        let holder = Assignee::department(current.department.clone());
        let previous = self
            .store
            .claim_rooms(&command.room_ids, &holder)
            .map_err(HousingError::from)
            .inspect_err(|error| refused(id, "allocate", error))?;

        let saved = match self.save_request(allocated, RequestStatus::Approved, "allocate") {
            Ok(saved) => saved,
            Err(error) => {
                self.release_rooms(previous);
                return Err(error);
            }
        };

        let at = self.clock.now();
        let rooms: Vec<Room> = previous
            .iter()
            .map(|room| {
                let mut occupied = room.clone();
                occupied.occupy(holder.clone());
                occupied
            })
            .collect();
        let records: Vec<AllocationRecord> = previous
            .iter()
            .zip(&rooms)
            .map(|(before, after)| {
                LedgerEntry {
                    request_id: Some(saved.id.clone()),
                    room: after,
                    source: before.assignee.clone(),
                    destination: Some(holder.clone()),
                    allocation_type: AllocationType::New,
                    operator: &command.operator,
                    note: &command.note,
                }
                .record(at)
            })
            .collect();

        if let Err(error) = self.store.append_allocations(records.clone()) {
            self.release_rooms(previous);
            if let Err(revert) = self.store.update_request(current, RequestStatus::Allocated) {
                warn!(request_id = %id, error = %revert, "unable to revert allocated request");
            }
            return Err(error.into());
        }

        info!(
            request_id = %saved.id,
            department = %saved.department,
            rooms = rooms.len(),
            operator = %command.operator.trim(),
            "rooms allocated"
        );
        Ok(AllocationOutcome {
            request: saved,
            rooms,
            records,
        })
    }

    pub fn confirm_move_in(&self, id: &RequestId) -> Result<SpaceRequest, HousingError> {
        let current = self.get_request(id)?;
        let next = machine::confirm_move_in(&current)
            .inspect_err(|error| refused(id, "confirm move-in", error))?;
        let saved = self.save_request(next, current.status, "confirm move-in")?;

        info!(request_id = %saved.id, "move-in confirmed");
        Ok(saved)
    }

    // ---- inventory ----

    pub fn register_room(&self, registration: RoomRegistration) -> Result<Room, HousingError> {
        let room = registration.into_room(self.clock.now())?;
        let id = room.id.clone();
        let stored = self.store.insert_room(room).map_err(|error| match error {
            RepositoryError::Conflict => {
                HousingError::Validation(format!("room {id} is already registered"))
            }
            other => other.into(),
        })?;

        info!(
            room_id = %stored.id,
            building = %stored.building,
            availability = stored.availability.label(),
            "room registered"
        );
        Ok(stored)
    }

    pub fn get_room(&self, id: &RoomId) -> Result<Room, HousingError> {
        self.store
            .fetch_room(id)?
            .ok_or_else(|| HousingError::not_found("room", id))
    }

    pub fn list_rooms(&self, availability: Option<Availability>) -> Result<Vec<Room>, HousingError> {
        let mut rooms = self.store.list_rooms()?;
        if let Some(availability) = availability {
            rooms.retain(|room| room.availability == availability);
        }
        Ok(rooms)
    }

    /// Administrator assignment that bypasses the request workflow.
    pub fn direct_assign(
        &self,
        room_id: &RoomId,
        assignment: DirectAssignment,
    ) -> Result<DirectAssignmentOutcome, HousingError> {
        assignment.validate()?;
        let current = self.get_room(room_id)?;
        let allocation_type =
            direct_assignment_type(current.assignee.as_ref(), &assignment.assignee);

        let mut next = current.clone();
        next.occupy(assignment.assignee.clone());
        self.store
            .update_room(next.clone(), current.availability)
            .map_err(|error| match error {
                RepositoryError::Stale => HousingError::InvalidStateTransition {
                    entity: "room",
                    id: room_id.to_string(),
                    state: "changed concurrently".to_string(),
                    operation: "assign",
                },
                RepositoryError::NotFound => HousingError::not_found("room", room_id),
                other => other.into(),
            })?;

        let appended = self.store.append_allocation(
            LedgerEntry {
                request_id: None,
                room: &next,
                source: current.assignee.clone(),
                destination: Some(assignment.assignee.clone()),
                allocation_type,
                operator: &assignment.operator,
                note: &assignment.note,
            }
            .record(self.clock.now()),
        );
        let record = match appended {
            Ok(record) => record,
            Err(error) => {
                if let Err(restore) = self.store.update_room(current, next.availability) {
                    warn!(room_id = %room_id, error = %restore, "unable to restore assigned room");
                }
                return Err(error.into());
            }
        };

        info!(
            room_id = %room_id,
            assignee = %assignment.assignee,
            allocation_type = allocation_type.label(),
            "room assigned directly"
        );
        Ok(DirectAssignmentOutcome { room: next, record })
    }

    /// Ledger entries, optionally limited to one room, in the order they were appended.
    pub fn allocations(
        &self,
        room_id: Option<&RoomId>,
    ) -> Result<Vec<AllocationRecord>, HousingError> {
        let mut records = self.store.list_allocations()?;
        if let Some(room_id) = room_id {
            records.retain(|record| &record.room.room_id == room_id);
        }
        Ok(records)
    }

    // ---- returns ----

    pub fn submit_return(
        &self,
        submission: ReturnSubmission,
    ) -> Result<ReturnRequest, HousingError> {
        submission.validate()?;
        let room = self.get_room(&submission.room_id)?;

        let already_open = self
            .store
            .list_returns()?
            .into_iter()
            .find(|request| request.room_id == room.id && request.is_open());
        if let Some(open) = already_open {
            return Err(HousingError::Validation(format!(
                "room {} already has open return {}",
                room.id, open.id
            )));
        }

        let request = returns::open(next_return_id(), submission, &room, self.clock.now())
            .inspect_err(|error| warn!(room_id = %room.id, %error, "return refused"))?;
        let stored = self.store.insert_return(request)?;

        info!(
            return_id = %stored.id,
            room_id = %stored.room_id,
            department = %stored.department,
            "room return submitted"
        );
        Ok(stored)
    }

    pub fn get_return(&self, id: &ReturnId) -> Result<ReturnRequest, HousingError> {
        self.store
            .fetch_return(id)?
            .ok_or_else(|| HousingError::not_found(RETURN, id))
    }

    pub fn list_returns(
        &self,
        status: Option<ReturnStatus>,
    ) -> Result<Vec<ReturnRequest>, HousingError> {
        let mut requests = self.store.list_returns()?;
        if let Some(status) = status {
            requests.retain(|request| request.status == status);
        }
        Ok(requests)
    }

    pub fn approve_return(&self, id: &ReturnId) -> Result<ReturnRequest, HousingError> {
        let current = self.get_return(id)?;
        let next = returns::approve(&current, self.clock.now())?;
        let saved = self.save_return(next, current.status, "approve")?;

        info!(return_id = %saved.id, room_id = %saved.room_id, "room return approved");
        Ok(saved)
    }

    /// Hands the room back to the pool. A second completion fails without side effects.
    pub fn complete_return(&self, id: &ReturnId) -> Result<ReturnCompletion, HousingError> {
        let current = self.get_return(id)?;
        let at = self.clock.now();
        let completed = returns::complete(&current, at)?;
        let room = self.get_room(&current.room_id)?;
        returns::ensure_returnable(&current, &room)
            .inspect_err(|error| warn!(return_id = %id, %error, "return completion refused"))?;

        let saved = self.save_return(completed, current.status, "complete")?;

        let mut vacated = room.clone();
        vacated.vacate(at);
        if let Err(error) = self.store.update_room(vacated.clone(), room.availability) {
            if let Err(revert) = self.store.update_return(current, ReturnStatus::Completed) {
                warn!(return_id = %id, error = %revert, "unable to revert completed return");
            }
            return Err(match error {
                RepositoryError::Stale => HousingError::InvalidStateTransition {
                    entity: "room",
                    id: room.id.to_string(),
                    state: "changed concurrently".to_string(),
                    operation: "vacate",
                },
                other => other.into(),
            });
        }

        let record = self.store.append_allocation(
            LedgerEntry {
                request_id: None,
                room: &vacated,
                source: room.assignee.clone(),
                destination: None,
                allocation_type: AllocationType::Return,
                operator: &saved.department,
                note: &saved.reason,
            }
            .record(at),
        )?;

        info!(
            return_id = %saved.id,
            room_id = %vacated.id,
            "room returned to inventory"
        );
        Ok(ReturnCompletion {
            request: saved,
            room: vacated,
            record,
        })
    }

    // ---- compliance ----

    pub fn classify_person(
        &self,
        occupancy: &PersonOccupancy,
    ) -> Result<PersonComplianceSnapshot, HousingError> {
        self.classifier.classify_person(occupancy)
    }

    pub fn classify_room(
        &self,
        submission: &RoomOccupancySubmission,
    ) -> Result<RoomComplianceSnapshot, HousingError> {
        self.classifier.classify_room(submission)
    }

    pub fn classify_department(
        &self,
        occupancy: &DepartmentOccupancy,
    ) -> Result<DepartmentComplianceSnapshot, HousingError> {
        self.classifier.classify_department(occupancy)
    }

    /// Registers a room occupancy form, merging into any record for the same room code.
    pub fn register_room_occupancy(
        &self,
        submission: RoomOccupancySubmission,
    ) -> Result<RoomComplianceSnapshot, HousingError> {
        self.classifier.classify_room(&submission)?;
        let record = self.store.upsert_occupancy(submission, self.clock.now())?;

        info!(
            room_code = %record.room_code,
            occupants = record.occupants.len(),
            "room occupancy registered"
        );
        Ok(record.classify())
    }

    pub fn room_occupancy_register(&self) -> Result<Vec<RoomComplianceSnapshot>, HousingError> {
        Ok(self
            .store
            .list_occupancy()?
            .iter()
            .map(RoomOccupancyRecord::classify)
            .collect())
    }

    pub fn quota_rules(&self) -> Vec<QuotaRule> {
        self.classifier.quota().rules()
    }

    // ---- persistence helpers ----

    fn save_request(
        &self,
        next: SpaceRequest,
        expected: RequestStatus,
        operation: &'static str,
    ) -> Result<SpaceRequest, HousingError> {
        match self.store.update_request(next.clone(), expected) {
            Ok(()) => Ok(next),
            Err(RepositoryError::Stale) => {
                let state = self
                    .store
                    .fetch_request(&next.id)?
                    .map(|request| request.status.label().to_string())
                    .unwrap_or_else(|| "removed".to_string());
                warn!(request_id = %next.id, operation, %state, "lost concurrent update");
                Err(HousingError::InvalidStateTransition {
                    entity: REQUEST,
                    id: next.id.to_string(),
                    state,
                    operation,
                })
            }
            Err(RepositoryError::NotFound) => Err(HousingError::not_found(REQUEST, &next.id)),
            Err(other) => Err(other.into()),
        }
    }

    fn save_return(
        &self,
        next: ReturnRequest,
        expected: ReturnStatus,
        operation: &'static str,
    ) -> Result<ReturnRequest, HousingError> {
        match self.store.update_return(next.clone(), expected) {
            Ok(()) => Ok(next),
            Err(RepositoryError::Stale) => {
                let current = self.get_return(&next.id)?;
                Err(match current.status {
                    ReturnStatus::Completed => HousingError::AlreadyCompleted {
                        entity: RETURN,
                        id: next.id.to_string(),
                    },
                    status => HousingError::InvalidStateTransition {
                        entity: RETURN,
                        id: next.id.to_string(),
                        state: status.label().to_string(),
                        operation,
                    },
                })
            }
            Err(RepositoryError::NotFound) => Err(HousingError::not_found(RETURN, &next.id)),
            Err(other) => Err(other.into()),
        }
    }

    fn release_rooms(&self, previous: Vec<Room>) {
        if let Err(error) = self.store.restore_rooms(previous) {
            warn!(%error, "unable to restore claimed rooms");
        }
    }
}

fn refused(id: &RequestId, operation: &'static str, error: &HousingError) {
    warn!(request_id = %id, operation, code = error.code(), %error, "command refused");
}
