//! In-memory implementation of every housing repository, with JSON snapshots standing in
//! for the "read current state / write new state" persistence boundary.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::allocation::AllocationRecord;
use super::approval::{RequestStatus, SpaceRequest};
use super::compliance::{RoomOccupancyRecord, RoomOccupancySubmission};
use super::domain::{reserve_ids, Assignee, RequestId, ReturnId, RoomId};
use super::inventory::{Availability, Room};
use super::repository::{
    AllocationLedger, OccupancyRepository, RepositoryError, ReturnRepository, RoomClaimError,
    RoomRepository, SpaceRequestRepository,
};
use super::returns::{ReturnRequest, ReturnStatus};

/// Serializable copy of every collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HousingSnapshot {
    #[serde(default)]
    pub requests: Vec<SpaceRequest>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub allocations: Vec<AllocationRecord>,
    #[serde(default)]
    pub returns: Vec<ReturnRequest>,
    #[serde(default)]
    pub occupancy: Vec<RoomOccupancyRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("unable to access snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HousingSnapshot {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// One lock per aggregate collection; no operation holds two collection locks at once.
///
/// With a snapshot file attached the store is write-through: every successful mutation
/// rewrites the file. The in-memory state stays authoritative when a write fails.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHousingStore {
    requests: Arc<Mutex<BTreeMap<RequestId, SpaceRequest>>>,
    rooms: Arc<Mutex<BTreeMap<RoomId, Room>>>,
    allocations: Arc<Mutex<Vec<AllocationRecord>>>,
    returns: Arc<Mutex<BTreeMap<ReturnId, ReturnRequest>>>,
    occupancy: Arc<Mutex<BTreeMap<String, RoomOccupancyRecord>>>,
    snapshot_file: Option<Arc<SnapshotFile>>,
}

#[derive(Debug)]
struct SnapshotFile {
    path: PathBuf,
    writer: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

fn occupancy_key(room_code: &str) -> String {
    room_code.trim().to_ascii_uppercase()
}

fn insert_new<K: Ord, V: Clone>(
    collection: &Mutex<BTreeMap<K, V>>,
    key: K,
    value: V,
) -> Result<V, RepositoryError> {
    let mut guard = lock(collection)?;
    if guard.contains_key(&key) {
        return Err(RepositoryError::Conflict);
    }
    guard.insert(key, value.clone());
    Ok(value)
}

fn replace_guarded<K: Ord, V>(
    collection: &Mutex<BTreeMap<K, V>>,
    key: &K,
    value: V,
    expected: impl Fn(&V) -> bool,
) -> Result<(), RepositoryError> {
    let mut guard = lock(collection)?;
    match guard.get_mut(key) {
        Some(stored) if expected(stored) => {
            *stored = value;
            Ok(())
        }
        Some(_) => Err(RepositoryError::Stale),
        None => Err(RepositoryError::NotFound),
    }
}

impl InMemoryHousingStore {
    pub fn from_snapshot(snapshot: HousingSnapshot) -> Self {
        reserve_ids(
            snapshot.requests.iter().map(|request| &request.id),
            snapshot.allocations.iter().map(|record| &record.id),
            snapshot.returns.iter().map(|request| &request.id),
        );

        Self {
            requests: Arc::new(Mutex::new(
                snapshot
                    .requests
                    .into_iter()
                    .map(|request| (request.id.clone(), request))
                    .collect(),
            )),
            rooms: Arc::new(Mutex::new(
                snapshot
                    .rooms
                    .into_iter()
                    .map(|room| (room.id.clone(), room))
                    .collect(),
            )),
            allocations: Arc::new(Mutex::new(snapshot.allocations)),
            returns: Arc::new(Mutex::new(
                snapshot
                    .returns
                    .into_iter()
                    .map(|request| (request.id.clone(), request))
                    .collect(),
            )),
            occupancy: Arc::new(Mutex::new(
                snapshot
                    .occupancy
                    .into_iter()
                    .map(|record| (occupancy_key(&record.room_code), record))
                    .collect(),
            )),
            snapshot_file: None,
        }
    }

    /// Rewrites `path` with the full store contents after every successful mutation.
    pub fn with_snapshot_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_file = Some(Arc::new(SnapshotFile {
            path: path.into(),
            writer: Mutex::new(()),
        }));
        self
    }

    pub fn snapshot(&self) -> Result<HousingSnapshot, RepositoryError> {
        Ok(HousingSnapshot {
            requests: lock(&self.requests)?.values().cloned().collect(),
            rooms: lock(&self.rooms)?.values().cloned().collect(),
            allocations: lock(&self.allocations)?.clone(),
            returns: lock(&self.returns)?.values().cloned().collect(),
            occupancy: lock(&self.occupancy)?.values().cloned().collect(),
        })
    }

    fn write_through<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        if let (Ok(_), Some(file)) = (&result, &self.snapshot_file) {
            if let Err(error) = self.write_snapshot(file) {
                warn!(path = %file.path.display(), %error, "unable to write housing snapshot");
            }
        }
        result
    }

    // The writer lock orders whole-file writes so a stale snapshot never lands last.
    fn write_snapshot(&self, file: &SnapshotFile) -> Result<(), SnapshotError> {
        let _writer = lock(&file.writer)?;
        let staging = file.path.with_extension("tmp");
        self.snapshot()?.write_to_path(&staging)?;
        fs::rename(&staging, &file.path)?;
        Ok(())
    }

    fn claim(&self, ids: &[RoomId], assignee: &Assignee) -> Result<Vec<Room>, RoomClaimError> {
        let mut guard = lock(&self.rooms)?;

        let mut previous = Vec::with_capacity(ids.len());
        for id in ids {
            let room = guard
                .get(id)
                .ok_or_else(|| RoomClaimError::NotFound(id.clone()))?;
            if !room.is_available() {
                return Err(RoomClaimError::Unavailable {
                    room_id: id.clone(),
                    availability: room.availability,
                });
            }
            previous.push(room.clone());
        }

        for id in ids {
            if let Some(room) = guard.get_mut(id) {
                room.occupy(assignee.clone());
            }
        }

        Ok(previous)
    }

    fn append(
        &self,
        records: Vec<AllocationRecord>,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        let mut guard = lock(&self.allocations)?;
        let mut seen: HashSet<_> = guard.iter().map(|existing| existing.id.clone()).collect();
        if !records.iter().all(|record| seen.insert(record.id.clone())) {
            return Err(RepositoryError::Conflict);
        }
        guard.extend(records.iter().cloned());
        Ok(records)
    }

    fn upsert(
        &self,
        submission: RoomOccupancySubmission,
        at: DateTime<Utc>,
    ) -> Result<RoomOccupancyRecord, RepositoryError> {
        let mut guard = lock(&self.occupancy)?;
        let key = occupancy_key(&submission.room_code);
        let record = match guard.remove(&key) {
            Some(existing) => existing.merge(submission, at),
            None => RoomOccupancyRecord::from_submission(submission, at),
        };
        guard.insert(key, record.clone());
        Ok(record)
    }
}

impl SpaceRequestRepository for InMemoryHousingStore {
    fn insert_request(&self, request: SpaceRequest) -> Result<SpaceRequest, RepositoryError> {
        let result = insert_new(&self.requests, request.id.clone(), request);
        self.write_through(result)
    }

    fn fetch_request(&self, id: &RequestId) -> Result<Option<SpaceRequest>, RepositoryError> {
        Ok(lock(&self.requests)?.get(id).cloned())
    }

    fn update_request(
        &self,
        request: SpaceRequest,
        expected: RequestStatus,
    ) -> Result<(), RepositoryError> {
        let id = request.id.clone();
        let result = replace_guarded(&self.requests, &id, request, |stored| {
            stored.status == expected
        });
        self.write_through(result)
    }

    fn list_requests(&self) -> Result<Vec<SpaceRequest>, RepositoryError> {
        Ok(lock(&self.requests)?.values().cloned().collect())
    }
}

impl RoomRepository for InMemoryHousingStore {
    fn insert_room(&self, room: Room) -> Result<Room, RepositoryError> {
        let result = insert_new(&self.rooms, room.id.clone(), room);
        self.write_through(result)
    }

    fn fetch_room(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        Ok(lock(&self.rooms)?.get(id).cloned())
    }

    fn list_rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        Ok(lock(&self.rooms)?.values().cloned().collect())
    }

    fn update_room(&self, room: Room, expected: Availability) -> Result<(), RepositoryError> {
        let id = room.id.clone();
        let result = replace_guarded(&self.rooms, &id, room, |stored| {
            stored.availability == expected
        });
        self.write_through(result)
    }

    fn claim_rooms(
        &self,
        ids: &[RoomId],
        assignee: &Assignee,
    ) -> Result<Vec<Room>, RoomClaimError> {
        let result = self.claim(ids, assignee);
        self.write_through(result)
    }

    fn restore_rooms(&self, rooms: Vec<Room>) -> Result<(), RepositoryError> {
        let result = lock(&self.rooms).map(|mut guard| {
            for room in rooms {
                guard.insert(room.id.clone(), room);
            }
        });
        self.write_through(result)
    }
}

impl AllocationLedger for InMemoryHousingStore {
    fn append_allocation(
        &self,
        record: AllocationRecord,
    ) -> Result<AllocationRecord, RepositoryError> {
        let result = self.append(vec![record.clone()]).map(|_| record);
        self.write_through(result)
    }

    fn append_allocations(
        &self,
        records: Vec<AllocationRecord>,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        let result = self.append(records);
        self.write_through(result)
    }

    fn list_allocations(&self) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(lock(&self.allocations)?.clone())
    }
}

impl ReturnRepository for InMemoryHousingStore {
    fn insert_return(&self, request: ReturnRequest) -> Result<ReturnRequest, RepositoryError> {
        let result = insert_new(&self.returns, request.id.clone(), request);
        self.write_through(result)
    }

    fn fetch_return(&self, id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError> {
        Ok(lock(&self.returns)?.get(id).cloned())
    }

    fn update_return(
        &self,
        request: ReturnRequest,
        expected: ReturnStatus,
    ) -> Result<(), RepositoryError> {
        let id = request.id.clone();
        let result = replace_guarded(&self.returns, &id, request, |stored| {
            stored.status == expected
        });
        self.write_through(result)
    }

    fn list_returns(&self) -> Result<Vec<ReturnRequest>, RepositoryError> {
        Ok(lock(&self.returns)?.values().cloned().collect())
    }
}

impl OccupancyRepository for InMemoryHousingStore {
    fn fetch_occupancy(
        &self,
        room_code: &str,
    ) -> Result<Option<RoomOccupancyRecord>, RepositoryError> {
        Ok(lock(&self.occupancy)?.get(&occupancy_key(room_code)).cloned())
    }

    fn upsert_occupancy(
        &self,
        submission: RoomOccupancySubmission,
        at: DateTime<Utc>,
    ) -> Result<RoomOccupancyRecord, RepositoryError> {
        let result = self.upsert(submission, at);
        self.write_through(result)
    }

    fn list_occupancy(&self) -> Result<Vec<RoomOccupancyRecord>, RepositoryError> {
        Ok(lock(&self.occupancy)?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::housing::allocation::{AllocationType, RoomSnapshot};
    use crate::workflows::housing::domain::AllocationId;
    use crate::workflows::housing::inventory::RoomRegistration;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
            .single()
            .expect("valid")
    }

    fn ledger_record(id: &str) -> AllocationRecord {
        AllocationRecord {
            id: AllocationId::from(id),
            request_id: None,
            room: RoomSnapshot {
                room_id: RoomId::from("B1-010"),
                building: "Biology Wing".to_string(),
                area: 30.0,
            },
            source: None,
            destination: Some(Assignee::department("Biology")),
            allocation_type: AllocationType::New,
            effective_at: at(),
            operator: "housing office".to_string(),
            note: String::new(),
        }
    }

    #[test]
    fn batch_append_is_all_or_nothing() {
        let store = InMemoryHousingStore::default();
        store
            .append_allocation(ledger_record("alloc-900001"))
            .expect("first append");

        let error = store
            .append_allocations(vec![
                ledger_record("alloc-900002"),
                ledger_record("alloc-900001"),
            ])
            .expect_err("duplicate id");
        assert!(matches!(error, RepositoryError::Conflict));

        let error = store
            .append_allocations(vec![
                ledger_record("alloc-900003"),
                ledger_record("alloc-900003"),
            ])
            .expect_err("duplicate within batch");
        assert!(matches!(error, RepositoryError::Conflict));

        let ids: Vec<_> = store
            .list_allocations()
            .expect("ledger")
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![AllocationId::from("alloc-900001")]);
    }

    #[test]
    fn occupancy_upsert_merges_by_room_code() {
        let store = InMemoryHousingStore::default();
        let submission = |code: &str, capacity: u32| RoomOccupancySubmission {
            room_code: code.to_string(),
            approved_capacity: capacity,
            occupants: Vec::new(),
            violations: Vec::new(),
        };

        store
            .upsert_occupancy(submission("b1-020", 2), at())
            .expect("created");
        let merged = store
            .upsert_occupancy(submission(" B1-020 ", 5), at())
            .expect("merged");

        assert_eq!(merged.approved_capacity, 5);
        assert_eq!(store.list_occupancy().expect("register").len(), 1);
    }

    #[test]
    fn snapshot_file_is_rewritten_after_each_mutation() {
        let path = std::env::temp_dir().join(format!(
            "campus-housing-write-through-{}.json",
            std::process::id()
        ));
        let store = InMemoryHousingStore::default().with_snapshot_file(&path);

        let room = RoomRegistration {
            id: RoomId::from("B1-030"),
            building: "Biology Wing".to_string(),
            floor: 1,
            area: 25.0,
            use_type: "office".to_string(),
            availability: Availability::Available,
            assignee: None,
        }
        .into_room(at())
        .expect("valid room");
        store.insert_room(room.clone()).expect("inserted");
        assert_eq!(
            HousingSnapshot::from_path(&path).expect("snapshot written").rooms,
            vec![room.clone()]
        );

        store
            .claim_rooms(&[room.id.clone()], &Assignee::department("Biology"))
            .expect("claimed");
        let written = HousingSnapshot::from_path(&path).expect("snapshot rewritten");
        assert_eq!(written.rooms[0].availability, Availability::Occupied);

        store
            .insert_room(room)
            .expect_err("duplicate room leaves file as is");
        assert_eq!(HousingSnapshot::from_path(&path).expect("snapshot"), written);

        let _ = std::fs::remove_file(&path);
    }
}
