use std::sync::Arc;

use campus_housing::error::AppError;
use campus_housing::workflows::housing::compliance::AssignedRoom;
use campus_housing::workflows::housing::{
    AllocationCommand, Availability, DepartmentOccupancy, Discipline, HousingService,
    InMemoryHousingStore, Occupant, OveragePolicy, PersonOccupancy, PersonViolation,
    PersonnelRank, QuotaRuleTable, RoomId, RoomOccupancySubmission, RoomRegistration,
    ReturnSubmission, SpaceRequestSubmission, StaffingCategory, StaffingLine, StudentLevel,
};
use chrono::{Local, NaiveDate};
use clap::Args;

use crate::infra::MemoryHousingService;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Request date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) requested_on: Option<NaiveDate>,
    /// Requested area in square metres for the demo request.
    #[arg(long, default_value_t = 1200.0)]
    pub(crate) area: f64,
    /// Skip the compliance portion of the demo.
    #[arg(long)]
    pub(crate) skip_compliance: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        requested_on,
        area,
        skip_compliance,
    } = args;
    let requested_on = requested_on.unwrap_or_else(|| Local::now().date_naive());

    let service: MemoryHousingService = HousingService::new(
        Arc::new(InMemoryHousingStore::default()),
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    );

    println!("Campus housing demo");
    run_allocation_demo(&service, area, requested_on)?;

    if skip_compliance {
        return Ok(());
    }
    run_compliance_demo(&service)
}

fn run_allocation_demo(
    service: &MemoryHousingService,
    area: f64,
    requested_on: NaiveDate,
) -> Result<(), AppError> {
    let mut room_ids = Vec::new();
    for (code, room_area) in [("ST-401", 600.0), ("ST-402", 600.0)] {
        let room = service.register_room(RoomRegistration {
            id: RoomId::from(code),
            building: "Science Tower".to_string(),
            floor: 4,
            area: room_area,
            use_type: "laboratory".to_string(),
            availability: Availability::Available,
            assignee: None,
        })?;
        room_ids.push(room.id);
    }
    println!("- Registered {} rooms in Science Tower", room_ids.len());

    let request = service.submit_request(SpaceRequestSubmission {
        department: "School of Life Sciences".to_string(),
        applicant: "Department office".to_string(),
        requested_area: area,
        intended_use: "shared research laboratory".to_string(),
        urgent: false,
        requested_on,
    })?;
    println!(
        "- Request {} for {:.0} m2 needs {} approval",
        request.id,
        request.requested_area,
        request.required_tier().label()
    );

    let mut current = request;
    while let Some(tier) = current.status.pending_tier() {
        let role = tier.designated_role();
        current = service.approve(&current.id, role, "reviewed")?;
        println!(
            "  {} -> {} ({})",
            role.label(),
            current.status.label(),
            current
                .latest_event()
                .map(|event| format!("{:?}", event.action))
                .unwrap_or_default()
        );
    }

    let outcome = service.allocate(
        &current.id,
        AllocationCommand {
            room_ids: room_ids.clone(),
            operator: "Housing Office".to_string(),
            note: "demo allocation".to_string(),
        },
    )?;
    println!(
        "- Allocated {} rooms; request now {}",
        outcome.rooms.len(),
        outcome.request.status.label()
    );
    service.confirm_move_in(&current.id)?;

    let returned = service.submit_return(ReturnSubmission {
        department: "School of Life Sciences".to_string(),
        room_id: room_ids[0].clone(),
        reason: "equipment consolidated into one laboratory".to_string(),
        expected_on: None,
    })?;
    service.approve_return(&returned.id)?;
    let completion = service.complete_return(&returned.id)?;
    println!(
        "- Return {} completed; room {} is {}",
        completion.request.id,
        completion.room.id,
        completion.room.availability.label()
    );

    println!("Allocation ledger:");
    for record in service.allocations(None)? {
        println!(
            "  {} {} {} -> {}",
            record.id,
            record.allocation_type.label(),
            record.room.room_id,
            record
                .destination
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "pool".to_string())
        );
    }
    Ok(())
}

fn run_compliance_demo(service: &MemoryHousingService) -> Result<(), AppError> {
    println!("\nCompliance snapshot");

    let person = service.classify_person(&PersonOccupancy {
        person_id: "T-1043".to_string(),
        name: "Professor Qian".to_string(),
        rank: PersonnelRank::Professor,
        rooms: vec![
            AssignedRoom {
                room_id: RoomId::from("ST-210"),
                area: 18.0,
            },
            AssignedRoom {
                room_id: RoomId::from("ST-212"),
                area: 14.0,
            },
        ],
        violations: vec![PersonViolation::OverStandardOccupancy],
    })?;
    println!(
        "- {}: {:.1} of {:.1} m2 -> {}",
        person.name,
        person.actual_area,
        person.quota_area,
        person.status.label()
    );

    let room = service.register_room_occupancy(RoomOccupancySubmission {
        room_code: "ST-305".to_string(),
        approved_capacity: 3,
        occupants: (1..=5)
            .map(|n| Occupant {
                subject_id: format!("G-{n:03}"),
                name: format!("Graduate {n}"),
                department: "School of Life Sciences".to_string(),
                duty_scope: "research".to_string(),
                registered: true,
            })
            .collect(),
        violations: Vec::new(),
    })?;
    let labels: Vec<_> = room.labels.iter().map(|label| label.label()).collect();
    println!(
        "- Room {}: {} occupants for {} places -> {}",
        room.room_code,
        room.facts.actual_count,
        room.approved_capacity,
        labels.join(", ")
    );

    let department = service.classify_department(&DepartmentOccupancy {
        department: "School of Life Sciences".to_string(),
        staffing: vec![
            StaffingLine {
                category: StaffingCategory::PersonnelRank(PersonnelRank::Professor),
                headcount: 6,
            },
            StaffingLine {
                category: StaffingCategory::StudentLevel(StudentLevel::Doctoral),
                headcount: 20,
            },
        ],
        discipline: Some(Discipline::Science),
        actual_area: 340.0,
    })?;
    println!(
        "- {}: {:.1} m2 against quota {:.1} m2 -> {}",
        department.department,
        department.actual_area,
        department.quota_area,
        department.status.label()
    );
    Ok(())
}
