use std::sync::{Arc, Barrier};
use std::thread;

use super::common::*;
use crate::workflows::housing::{
    AllocationCommand, AllocationType, Assignee, Availability, DirectAssignment, HousingError,
    RequestStatus, RoomId, RoomRepository,
};

fn command(room_ids: Vec<RoomId>) -> AllocationCommand {
    AllocationCommand {
        room_ids,
        operator: "housing office".to_string(),
        note: "autumn intake".to_string(),
    }
}

#[test]
fn allocation_occupies_rooms_and_writes_ledger() {
    let (service, _, _) = build_service();
    let rooms = register_rooms(&service, &["E3-301", "E3-302"]);
    let request = approved_request(&service, 80.0);

    let outcome = service
        .allocate(&request.id, command(rooms.clone()))
        .expect("allocation succeeds");

    assert_eq!(outcome.request.status, RequestStatus::Allocated);
    assert_eq!(outcome.records.len(), 2);
    for record in &outcome.records {
        assert_eq!(record.allocation_type, AllocationType::New);
        assert_eq!(record.request_id.as_ref(), Some(&request.id));
        assert_eq!(record.source, None);
        assert_eq!(
            record.destination,
            Some(Assignee::department("School of Materials"))
        );
    }

    for room_id in &rooms {
        let room = service.get_room(room_id).expect("room exists");
        assert_eq!(room.availability, Availability::Occupied);
        assert!(room.assignee.as_ref().expect("holder").is_held_by("school of materials"));
        assert!(room.is_consistent());
    }
    assert_eq!(service.allocations(None).expect("ledger").len(), 2);

    let completed = service
        .confirm_move_in(&request.id)
        .expect("move-in confirmed");
    assert_eq!(completed.status, RequestStatus::Completed);
    assert_eq!(
        service
            .confirm_move_in(&request.id)
            .expect_err("already completed")
            .code(),
        "already_completed"
    );
}

#[test]
fn one_unavailable_room_leaves_everything_untouched() {
    let (service, store, _) = build_service();
    let rooms = register_rooms(&service, &["E3-310", "E3-311"]);
    let mut maintenance = room_registration("E3-312", 25.0);
    maintenance.availability = Availability::Maintenance;
    service.register_room(maintenance).expect("room registers");

    let request = approved_request(&service, 60.0);
    let mut selection = rooms.clone();
    selection.push(RoomId::from("E3-312"));

    let error = service
        .allocate(&request.id, command(selection))
        .expect_err("maintenance room blocks allocation");
    assert!(matches!(
        error,
        HousingError::RoomUnavailable { ref room_id, .. } if room_id == "E3-312"
    ));

    for room_id in &rooms {
        let room = store.fetch_room(room_id).expect("fetch").expect("present");
        assert_eq!(room.availability, Availability::Available);
        assert!(room.assignee.is_none());
    }
    assert_eq!(
        service.get_request(&request.id).expect("stored").status,
        RequestStatus::Approved
    );
    assert!(service.allocations(None).expect("ledger").is_empty());
}

#[test]
fn allocation_requires_an_approved_request() {
    let (service, _, _) = build_service();
    let rooms = register_rooms(&service, &["E3-320"]);
    let pending = service
        .submit_request(request_submission(30.0))
        .expect("submitted");

    let error = service
        .allocate(&pending.id, command(rooms))
        .expect_err("pending request");
    assert_eq!(error.code(), "invalid_state_transition");
}

#[test]
fn empty_or_unknown_room_selection_is_refused() {
    let (service, _, _) = build_service();
    let request = approved_request(&service, 30.0);

    let error = service
        .allocate(&request.id, command(Vec::new()))
        .expect_err("no rooms");
    assert_eq!(error.code(), "validation_error");

    let error = service
        .allocate(&request.id, command(vec![RoomId::from("Z-000")]))
        .expect_err("unknown room");
    assert_eq!(error.code(), "not_found");
    assert_eq!(
        service.get_request(&request.id).expect("stored").status,
        RequestStatus::Approved
    );
}

#[test]
fn concurrent_allocations_of_one_room_have_a_single_winner() {
    let (service, _, _) = build_service();
    let rooms = register_rooms(&service, &["E3-330"]);
    let first = approved_request(&service, 45.0);
    let second = approved_request(&service, 45.0);
    let service = Arc::new(service);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [first.id.clone(), second.id.clone()]
        .into_iter()
        .map(|request_id| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            let rooms = rooms.clone();
            thread::spawn(move || {
                barrier.wait();
                service.allocate(&request_id, command(rooms))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one loser");
    assert_eq!(loser.code(), "room_unavailable");

    let statuses: Vec<_> = [&first.id, &second.id]
        .into_iter()
        .map(|id| service.get_request(id).expect("stored").status)
        .collect();
    assert!(statuses.contains(&RequestStatus::Allocated));
    assert!(statuses.contains(&RequestStatus::Approved));
    assert_eq!(service.allocations(None).expect("ledger").len(), 1);
}

#[test]
fn direct_assignment_records_new_adjust_and_transfer() {
    let (service, _, _) = build_service();
    let rooms = register_rooms(&service, &["E3-340"]);
    let room_id = &rooms[0];

    let physics = DirectAssignment {
        assignee: Assignee::department("Physics"),
        operator: "admin".to_string(),
        note: String::new(),
    };
    let first = service
        .direct_assign(room_id, physics.clone())
        .expect("assigns");
    assert_eq!(first.record.allocation_type, AllocationType::New);
    assert_eq!(first.room.availability, Availability::Occupied);

    let again = service
        .direct_assign(room_id, physics)
        .expect("reassigns");
    assert_eq!(again.record.allocation_type, AllocationType::Adjust);

    let moved = service
        .direct_assign(
            room_id,
            DirectAssignment {
                assignee: Assignee::Individual {
                    name: "Liu Yang".to_string(),
                    department: Some("Chemistry".to_string()),
                },
                operator: "admin".to_string(),
                note: "visiting scholar".to_string(),
            },
        )
        .expect("transfers");
    assert_eq!(moved.record.allocation_type, AllocationType::Transfer);
    assert_eq!(moved.record.source, Some(Assignee::department("Physics")));

    assert_eq!(service.allocations(Some(room_id)).expect("ledger").len(), 3);
}

#[test]
fn direct_assignment_requires_a_named_assignee() {
    let (service, _, _) = build_service();
    let rooms = register_rooms(&service, &["E3-350"]);

    let error = service
        .direct_assign(
            &rooms[0],
            DirectAssignment {
                assignee: Assignee::department(" "),
                operator: "admin".to_string(),
                note: String::new(),
            },
        )
        .expect_err("blank name");
    assert_eq!(error.code(), "validation_error");
    assert!(service.get_room(&rooms[0]).expect("room").is_available());
}

#[test]
fn duplicate_room_registration_is_refused() {
    let (service, _, _) = build_service();
    register_rooms(&service, &["E3-360"]);
    let error = service
        .register_room(room_registration("E3-360", 12.0))
        .expect_err("duplicate");
    assert_eq!(error.code(), "validation_error");
}
