//! Quota-driven compliance classification through the public API, including quota tables
//! loaded from CSV.

use std::io::Cursor;
use std::sync::Arc;

use campus_housing::workflows::housing::compliance::{
    normalize, status_for, AssignedRoom, PersonComplianceStatus, ViolationSet,
};
use campus_housing::workflows::housing::{
    ComplianceClassifier, DepartmentComplianceStatus, DepartmentOccupancy, OveragePolicy,
    PersonOccupancy, PersonViolation, PersonnelRank, QuotaRuleTable, RoomId, RoomViolation,
    StaffingCategory, StaffingLine,
};

fn chemistry(actual_area: f64) -> DepartmentOccupancy {
    DepartmentOccupancy {
        department: "School of Chemistry".to_string(),
        staffing: vec![StaffingLine {
            category: StaffingCategory::PersonnelRank(PersonnelRank::Professor),
            headcount: 5,
        }],
        discipline: None,
        actual_area,
    }
}

#[test]
fn csv_quota_overrides_change_department_bands() {
    let csv = "category,key,coefficient\npersonnel_rank,professor,20\n";
    let table = QuotaRuleTable::from_reader(Cursor::new(csv)).expect("rules load");
    let classifier = ComplianceClassifier::new(Arc::new(table), OveragePolicy::default());

    let partial = classifier
        .classify_department(&chemistry(105.0))
        .expect("classifies");
    assert_eq!(partial.quota_area, 100.0);
    assert_eq!(partial.status, DepartmentComplianceStatus::PartialOverage);
    assert_eq!(partial.excess_area, 5.0);

    let severe = classifier
        .classify_department(&chemistry(115.0))
        .expect("classifies");
    assert_eq!(severe.status, DepartmentComplianceStatus::SevereOverage);

    let standard = ComplianceClassifier::new(
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    );
    let compliant = standard
        .classify_department(&chemistry(115.0))
        .expect("classifies");
    assert_eq!(compliant.quota_area, 120.0);
    assert_eq!(compliant.status, DepartmentComplianceStatus::FullyCompliant);
}

#[test]
fn department_with_no_staff_and_some_area_is_severe() {
    let classifier = ComplianceClassifier::new(
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    );
    let mut occupancy = chemistry(12.0);
    occupancy.staffing.clear();

    let snapshot = classifier
        .classify_department(&occupancy)
        .expect("classifies");
    assert_eq!(snapshot.quota_area, 0.0);
    assert_eq!(snapshot.excess_ratio, None);
    assert_eq!(snapshot.status, DepartmentComplianceStatus::SevereOverage);
}

#[test]
fn negative_department_area_is_rejected() {
    let classifier = ComplianceClassifier::new(
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    );
    let error = classifier
        .classify_department(&chemistry(-1.0))
        .expect_err("negative area");
    assert_eq!(error.code(), "validation_error");
}

#[test]
fn person_rooms_must_have_positive_area() {
    let classifier = ComplianceClassifier::new(
        Arc::new(QuotaRuleTable::standard()),
        OveragePolicy::default(),
    );
    let occupancy = PersonOccupancy {
        person_id: "T-7".to_string(),
        name: "Xu Ming".to_string(),
        rank: PersonnelRank::MidOrBelow,
        rooms: vec![AssignedRoom {
            room_id: RoomId::from("B1-001"),
            area: 0.0,
        }],
        violations: Vec::new(),
    };
    assert_eq!(
        classifier
            .classify_person(&occupancy)
            .expect_err("zero area")
            .code(),
        "validation_error"
    );
}

#[test]
fn tag_normalization_is_idempotent() {
    let raw = [
        RoomViolation::None,
        RoomViolation::UnauthorizedSharedUse,
        RoomViolation::UnauthorizedSharedUse,
    ];
    let once = normalize(raw.into_iter().collect());
    let twice = normalize(once.clone());
    assert_eq!(once, twice);
    assert!(!once.contains(&RoomViolation::None));

    let empty = ViolationSet::<PersonViolation>::normalized(Vec::new());
    assert!(empty.contains(PersonViolation::None));
    assert_eq!(status_for(&empty), PersonComplianceStatus::FullyCompliant);

    let serialized = serde_json::to_value(ViolationSet::normalized([
        PersonViolation::None,
        PersonViolation::IdleWaste,
    ]))
    .expect("serializes");
    assert_eq!(serialized, serde_json::json!(["idle_waste"]));
}
