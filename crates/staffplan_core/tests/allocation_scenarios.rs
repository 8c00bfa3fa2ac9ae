use staffplan_core::db::{open_db, open_db_in_memory, share};
use staffplan_core::timeline::MILLIS_PER_DAY;
use staffplan_core::{
    progress_percent, AssignmentError, AssignmentRequest, AssignmentStatus, Engineer,
    NewEngineer, NewProject, Project, Seniority, StaffingEngine, UtilizationBucket,
    ValidationError,
};
use std::sync::Barrier;
use uuid::Uuid;

const JAN_1_2024: i64 = 1_704_067_200_000;

fn engine() -> StaffingEngine {
    StaffingEngine::open(share(open_db_in_memory().unwrap())).unwrap()
}

fn register(engine: &StaffingEngine, name: &str) -> Engineer {
    engine
        .roster()
        .register_engineer(&NewEngineer {
            name: name.to_string(),
            skills: vec!["Rust".to_string()],
            seniority: Seniority::Mid,
            department: "Platform".to_string(),
            max_capacity: Some(100),
        })
        .unwrap()
}

fn project(engine: &StaffingEngine, name: &str) -> Project {
    engine
        .projects()
        .create_project(&NewProject {
            name: name.to_string(),
            description: None,
            required_skills: Vec::new(),
            status: None,
            priority: None,
            team_size: Some(3),
            start_date: JAN_1_2024,
            end_date: JAN_1_2024 + 10 * MILLIS_PER_DAY,
        })
        .unwrap()
}

fn request(project: &Project, engineer: &Engineer, percent: u32) -> AssignmentRequest {
    AssignmentRequest {
        project_id: project.id,
        engineer_id: engineer.id,
        allocation_percentage: percent,
        start_date: JAN_1_2024,
        end_date: JAN_1_2024 + 10 * MILLIS_PER_DAY,
        role: "Developer".to_string(),
    }
}

fn capacity_row(
    engine: &StaffingEngine,
    engineer: &Engineer,
) -> staffplan_core::EngineerCapacityRow {
    engine
        .dashboard()
        .engineer_capacity()
        .unwrap()
        .into_iter()
        .find(|row| row.id == engineer.id)
        .unwrap()
}

#[test]
fn scenarios_a_b_c_idle_then_loaded_then_rejected() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let atlas = project(&engine, "Atlas");
    let borealis = project(&engine, "Borealis");

    let idle = capacity_row(&engine, &ada);
    assert_eq!(idle.available_capacity, 100);
    assert_eq!(idle.utilization_percent, 0.0);
    assert_eq!(idle.bucket, UtilizationBucket::Available);

    engine
        .assignments()
        .propose_assignment(&request(&atlas, &ada, 80))
        .unwrap();
    let loaded = capacity_row(&engine, &ada);
    assert_eq!(loaded.total_allocated, 80);
    assert_eq!(loaded.available_capacity, 20);
    assert_eq!(loaded.utilization_percent, 80.0);
    assert_eq!(loaded.bucket, UtilizationBucket::HighLoad);

    let err = engine
        .assignments()
        .propose_assignment(&request(&borealis, &ada, 25))
        .unwrap_err();
    assert!(matches!(
        err,
        AssignmentError::CapacityExceeded {
            requested: 25,
            available: 20
        }
    ));
    assert_eq!(err.code(), "capacity_exceeded");
    assert_eq!(engine.ledger().total_allocated(ada.id), 80);
    assert!(engine.audit_totals().unwrap().is_empty());
}

#[test]
fn scenario_d_progress_is_half_way() {
    let now = JAN_1_2024 + 5 * MILLIS_PER_DAY;
    assert_eq!(
        progress_percent(JAN_1_2024, JAN_1_2024 + 10 * MILLIS_PER_DAY, now),
        50.0
    );
}

#[test]
fn scenario_e_concurrent_requests_cannot_overcommit() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let base = project(&engine, "Base");
    engine
        .assignments()
        .propose_assignment(&request(&base, &ada, 80))
        .unwrap();

    let left = project(&engine, "Left");
    let right = project(&engine, "Right");
    let barrier = Barrier::new(2);

    let (first, second) = std::thread::scope(|scope| {
        let run = |target: &Project| {
            barrier.wait();
            engine
                .assignments()
                .propose_assignment(&request(target, &ada, 15))
        };
        let a = scope.spawn(move || run(&left));
        let b = scope.spawn(move || run(&right));
        (a.join().unwrap(), b.join().unwrap())
    });

    let accepted = [&first, &second]
        .iter()
        .filter(|outcome| outcome.is_ok())
        .count();
    assert_eq!(accepted, 1);
    let rejected = if first.is_err() { first } else { second };
    assert!(matches!(
        rejected,
        Err(AssignmentError::CapacityExceeded { requested: 15, .. })
    ));
    assert_eq!(engine.ledger().total_allocated(ada.id), 95);
    assert_eq!(engine.ledger().stored_total(ada.id).unwrap(), 95);
}

#[test]
fn many_engineers_commit_in_parallel_within_capacity() {
    let engine = engine();
    let engineers: Vec<Engineer> = (0..4)
        .map(|index| register(&engine, &format!("Engineer {index}")))
        .collect();
    let projects: Vec<Project> = (0..6)
        .map(|index| project(&engine, &format!("Project {index}")))
        .collect();

    std::thread::scope(|scope| {
        for engineer in &engineers {
            let engine = &engine;
            let projects = &projects;
            scope.spawn(move || {
                for target in projects {
                    let _ = engine
                        .assignments()
                        .propose_assignment(&request(target, engineer, 30));
                }
            });
        }
    });

    for engineer in &engineers {
        assert_eq!(engine.ledger().total_allocated(engineer.id), 90);
        assert_eq!(engine.ledger().assignments_for(engineer.id).len(), 3);
    }
    assert!(engine.audit_totals().unwrap().is_empty());
}

#[test]
fn boundary_exact_remaining_capacity_is_accepted() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let [base, over, exact] = ["Base", "Over", "Exact"].map(|name| project(&engine, name));
    engine
        .assignments()
        .propose_assignment(&request(&base, &ada, 80))
        .unwrap();

    assert!(matches!(
        engine
            .assignments()
            .propose_assignment(&request(&over, &ada, 21)),
        Err(AssignmentError::CapacityExceeded {
            requested: 21,
            available: 20
        })
    ));
    assert_eq!(engine.ledger().total_allocated(ada.id), 80);

    engine
        .assignments()
        .propose_assignment(&request(&exact, &ada, 20))
        .unwrap();
    assert_eq!(engine.ledger().available_capacity(ada.id), Some(0));
}

#[test]
fn assign_then_unassign_restores_available_capacity() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let [base, atlas] = ["Base", "Atlas"].map(|name| project(&engine, name));
    engine
        .assignments()
        .propose_assignment(&request(&base, &ada, 35))
        .unwrap();
    let before = engine.ledger().available_capacity(ada.id).unwrap();

    engine
        .assignments()
        .propose_assignment(&request(&atlas, &ada, 45))
        .unwrap();
    let removed = engine
        .assignments()
        .propose_unassign(atlas.id, ada.id)
        .unwrap();
    assert_eq!(removed.allocation_percentage, 45);
    assert_eq!(engine.ledger().available_capacity(ada.id), Some(before));

    let err = engine
        .assignments()
        .propose_unassign(atlas.id, ada.id)
        .unwrap_err();
    assert!(matches!(err, AssignmentError::AssignmentNotFound { .. }));
    assert_eq!(err.code(), "not_found");
}

#[test]
fn preconditions_short_circuit_in_order() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let atlas = project(&engine, "Atlas");

    let mut missing_both = request(&atlas, &ada, 0);
    missing_both.engineer_id = Uuid::new_v4();
    missing_both.project_id = Uuid::new_v4();
    assert!(matches!(
        engine.assignments().propose_assignment(&missing_both),
        Err(AssignmentError::EngineerNotFound(_))
    ));

    let mut missing_project = request(&atlas, &ada, 0);
    missing_project.project_id = Uuid::new_v4();
    assert!(matches!(
        engine.assignments().propose_assignment(&missing_project),
        Err(AssignmentError::ProjectNotFound(_))
    ));

    let mut zero_and_inverted = request(&atlas, &ada, 0);
    zero_and_inverted.end_date = zero_and_inverted.start_date - 1;
    assert!(matches!(
        engine.assignments().propose_assignment(&zero_and_inverted),
        Err(AssignmentError::Validation(
            ValidationError::AllocationOutOfRange(0)
        ))
    ));

    let mut inverted = request(&atlas, &ada, 10);
    inverted.end_date = inverted.start_date - 1;
    let err = engine
        .assignments()
        .propose_assignment(&inverted)
        .unwrap_err();
    assert!(matches!(
        err,
        AssignmentError::Validation(ValidationError::InvalidDateRange { .. })
    ));
    assert_eq!(err.code(), "validation_error");

    let mut blank_role = request(&atlas, &ada, 10);
    blank_role.role = "   ".to_string();
    assert!(matches!(
        engine.assignments().propose_assignment(&blank_role),
        Err(AssignmentError::Validation(ValidationError::BlankRole))
    ));

    assert_eq!(engine.ledger().total_allocated(ada.id), 0);
    assert_eq!(engine.ledger().stored_total(ada.id).unwrap(), 0);
}

#[test]
fn second_assignment_on_same_project_is_rejected() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let atlas = project(&engine, "Atlas");
    engine
        .assignments()
        .propose_assignment(&request(&atlas, &ada, 10))
        .unwrap();

    assert!(matches!(
        engine
            .assignments()
            .propose_assignment(&request(&atlas, &ada, 10)),
        Err(AssignmentError::Validation(
            ValidationError::DuplicateAssignment { .. }
        ))
    ));
    assert_eq!(engine.ledger().total_allocated(ada.id), 10);
}

#[test]
fn status_is_derived_from_now_on_every_read() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let atlas = project(&engine, "Atlas");
    engine
        .assignments()
        .propose_assignment(&request(&atlas, &ada, 10))
        .unwrap();

    let status_at = |now| {
        engine
            .assignments()
            .assignment_status(atlas.id, ada.id, now)
            .unwrap()
    };
    assert_eq!(status_at(JAN_1_2024 - 1), AssignmentStatus::Pending);
    assert_eq!(status_at(JAN_1_2024), AssignmentStatus::Active);
    assert_eq!(
        status_at(JAN_1_2024 + 10 * MILLIS_PER_DAY),
        AssignmentStatus::Active
    );
    assert_eq!(
        status_at(JAN_1_2024 + 10 * MILLIS_PER_DAY + 1),
        AssignmentStatus::Completed
    );
}

#[test]
fn preview_reports_projection_and_maximum() {
    let engine = engine();
    let ada = register(&engine, "Ada");
    let atlas = project(&engine, "Atlas");
    engine
        .assignments()
        .propose_assignment(&request(&atlas, &ada, 60))
        .unwrap();

    let preview = engine.assignments().preview(ada.id, 35).unwrap();
    assert_eq!(preview.current_utilization_percent, 60.0);
    assert_eq!(preview.projected_utilization_percent, 95.0);
    assert_eq!(preview.projected_bucket, UtilizationBucket::Overloaded);
    assert_eq!(preview.max_allowed, 40);
    assert!(preview.fits);

    assert!(!engine.assignments().preview(ada.id, 41).unwrap().fits);
}

#[test]
fn reopened_engine_rebuilds_totals_from_stored_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staffplan.db");

    let (ada, atlas) = {
        let engine = StaffingEngine::open(share(open_db(&path).unwrap())).unwrap();
        let ada = register(&engine, "Ada");
        let atlas = project(&engine, "Atlas");
        let borealis = project(&engine, "Borealis");
        engine
            .assignments()
            .propose_assignment(&request(&atlas, &ada, 50))
            .unwrap();
        engine
            .assignments()
            .propose_assignment(&request(&borealis, &ada, 30))
            .unwrap();
        (ada, atlas)
    };

    let engine = StaffingEngine::open(share(open_db(&path).unwrap())).unwrap();
    assert_eq!(engine.ledger().total_allocated(ada.id), 80);
    assert!(engine.ledger().find_assignment(atlas.id, ada.id).is_some());

    let removed = engine
        .assignments()
        .propose_unassign(atlas.id, ada.id)
        .unwrap();
    assert_eq!(removed.allocation_percentage, 50);
    assert_eq!(engine.ledger().stored_total(ada.id).unwrap(), 30);
}
