use staffplan_core::db::{open_db_in_memory, share};
use staffplan_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use staffplan_core::timeline::MILLIS_PER_DAY;
use staffplan_core::{
    Assignment, AssignmentError, AssignmentRequest, LedgerError, NewEngineer, NewProject,
    ProfileUpdate, ProjectFilter, ProjectPriority, ProjectServiceError, ProjectStatus,
    ProjectSummary, RepoError, RosterError, Seniority, StaffingEngine, ValidationError,
};
use std::sync::Barrier;

fn engine() -> StaffingEngine {
    StaffingEngine::open(share(open_db_in_memory().unwrap())).unwrap()
}

fn new_engineer(name: &str, max_capacity: Option<u32>) -> NewEngineer {
    NewEngineer {
        name: name.to_string(),
        skills: vec![" Rust ".to_string(), "react".to_string(), "RUST".to_string()],
        seniority: Seniority::Senior,
        department: " Platform ".to_string(),
        max_capacity,
    }
}

fn new_project(name: &str, priority: ProjectPriority) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: Some("Internal tooling".to_string()),
        required_skills: vec!["Go".to_string()],
        status: Some(ProjectStatus::Active),
        priority: Some(priority),
        team_size: Some(2),
        start_date: 0,
        end_date: 10 * MILLIS_PER_DAY,
    }
}

fn assign(
    engine: &StaffingEngine,
    project_id: uuid::Uuid,
    engineer_id: uuid::Uuid,
    percent: u32,
) {
    engine
        .assignments()
        .propose_assignment(&AssignmentRequest {
            project_id,
            engineer_id,
            allocation_percentage: percent,
            start_date: 0,
            end_date: MILLIS_PER_DAY,
            role: "Developer".to_string(),
        })
        .unwrap();
}

#[test]
fn registration_normalizes_input_and_defaults_capacity() {
    let engine = engine();
    let ada = engine
        .roster()
        .register_engineer(&new_engineer(" Ada ", None))
        .unwrap();

    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.department, "Platform");
    assert_eq!(ada.skills, vec!["react".to_string(), "rust".to_string()]);
    assert_eq!(ada.max_capacity, 100);
    assert_eq!(engine.roster().get_engineer(ada.id).unwrap(), ada);
    assert_eq!(engine.ledger().available_capacity(ada.id), Some(100));
}

#[test]
fn registration_rejects_zero_capacity_and_blank_name() {
    let engine = engine();
    assert!(matches!(
        engine
            .roster()
            .register_engineer(&new_engineer("Ada", Some(0))),
        Err(RosterError::Validation(
            ValidationError::MaxCapacityOutOfRange(0)
        ))
    ));
    assert!(matches!(
        engine.roster().register_engineer(&new_engineer("  ", None)),
        Err(RosterError::Validation(ValidationError::BlankName))
    ));
    assert!(engine.roster().list_engineers().unwrap().is_empty());
}

#[test]
fn capacity_cannot_be_lowered_below_committed_work() {
    let engine = engine();
    let ada = engine
        .roster()
        .register_engineer(&new_engineer("Ada", None))
        .unwrap();
    let atlas = engine
        .projects()
        .create_project(&new_project("Atlas", ProjectPriority::High))
        .unwrap();
    assign(&engine, atlas.id, ada.id, 60);

    let err = engine
        .roster()
        .update_profile(
            ada.id,
            &ProfileUpdate {
                max_capacity: Some(50),
                ..ProfileUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::CapacityBelowCommitted {
            requested: 50,
            committed: 60
        }
    ));
    assert_eq!(engine.roster().get_engineer(ada.id).unwrap().max_capacity, 100);

    let part_time = engine
        .roster()
        .update_profile(
            ada.id,
            &ProfileUpdate {
                max_capacity: Some(60),
                department: Some("Data".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(part_time.department, "Data");
    assert_eq!(engine.roster().get_engineer(ada.id).unwrap().max_capacity, 60);
    assert_eq!(engine.ledger().available_capacity(ada.id), Some(0));
}

#[test]
fn concurrent_profile_edits_to_different_fields_both_persist() {
    for _ in 0..50 {
        let engine = engine();
        let ada = engine
            .roster()
            .register_engineer(&new_engineer("Ada", None))
            .unwrap();
        let barrier = Barrier::new(2);

        std::thread::scope(|scope| {
            let edit = |update: ProfileUpdate| {
                let barrier = &barrier;
                let engine = &engine;
                move || {
                    barrier.wait();
                    engine.roster().update_profile(ada.id, &update).unwrap();
                }
            };
            scope.spawn(edit(ProfileUpdate {
                skills: Some(vec!["Kotlin".to_string()]),
                ..ProfileUpdate::default()
            }));
            scope.spawn(edit(ProfileUpdate {
                max_capacity: Some(60),
                ..ProfileUpdate::default()
            }));
        });

        let stored = engine.roster().get_engineer(ada.id).unwrap();
        assert_eq!(stored.skills, vec!["kotlin".to_string()]);
        assert_eq!(stored.max_capacity, 60);
        assert_eq!(engine.ledger().max_capacity(ada.id), Some(60));
    }
}

#[test]
fn deleting_project_releases_every_assignment() {
    let engine = engine();
    let ada = engine
        .roster()
        .register_engineer(&new_engineer("Ada", None))
        .unwrap();
    let grace = engine
        .roster()
        .register_engineer(&new_engineer("Grace", None))
        .unwrap();
    let atlas = engine
        .projects()
        .create_project(&new_project("Atlas", ProjectPriority::High))
        .unwrap();
    let borealis = engine
        .projects()
        .create_project(&new_project("Borealis", ProjectPriority::Low))
        .unwrap();
    assign(&engine, atlas.id, ada.id, 50);
    assign(&engine, atlas.id, grace.id, 70);
    assign(&engine, borealis.id, ada.id, 20);
    assert_eq!(engine.projects().staffing_count(atlas.id), 2);

    assert_eq!(engine.projects().delete_project(atlas.id).unwrap(), 2);
    assert_eq!(engine.ledger().total_allocated(ada.id), 20);
    assert_eq!(engine.ledger().total_allocated(grace.id), 0);
    assert_eq!(engine.ledger().stored_total(grace.id).unwrap(), 0);
    assert_eq!(engine.projects().staffing_count(atlas.id), 0);
    assert_eq!(engine.projects().staffing_count(borealis.id), 1);

    assert!(matches!(
        engine.projects().get_project(atlas.id),
        Err(ProjectServiceError::ProjectNotFound(id)) if id == atlas.id
    ));
    assert!(matches!(
        engine.projects().delete_project(atlas.id),
        Err(ProjectServiceError::ProjectNotFound(_))
    ));
    assert!(engine.audit_totals().unwrap().is_empty());
}

#[test]
fn commit_racing_a_project_delete_leaves_no_phantom_capacity() {
    let conn = share(open_db_in_memory().unwrap());
    let engine = StaffingEngine::open(conn.clone()).unwrap();
    let rows = SqliteProjectRepository::new(conn);
    let ada = engine
        .roster()
        .register_engineer(&new_engineer("Ada", None))
        .unwrap();

    // Commit lands first; the row delete cascades before the ledger sweep.
    let atlas = engine
        .projects()
        .create_project(&new_project("Atlas", ProjectPriority::High))
        .unwrap();
    assign(&engine, atlas.id, ada.id, 60);
    rows.delete_project(atlas.id).unwrap();
    assert_eq!(engine.ledger().stored_total(ada.id).unwrap(), 0);
    assert_eq!(engine.ledger().release_project(atlas.id).unwrap().len(), 1);
    assert_eq!(engine.ledger().total_allocated(ada.id), 0);

    // Unassign still frees capacity when the cascade got there first.
    let borealis = engine
        .projects()
        .create_project(&new_project("Borealis", ProjectPriority::Low))
        .unwrap();
    assign(&engine, borealis.id, ada.id, 40);
    rows.delete_project(borealis.id).unwrap();
    engine
        .assignments()
        .propose_unassign(borealis.id, ada.id)
        .unwrap();
    assert_eq!(engine.ledger().total_allocated(ada.id), 0);

    // Commit arrives after the row is gone: the insert is refused.
    let cobalt = engine
        .projects()
        .create_project(&new_project("Cobalt", ProjectPriority::Medium))
        .unwrap();
    rows.delete_project(cobalt.id).unwrap();
    let late = Assignment::new(cobalt.id, ada.id, 60, 0, MILLIS_PER_DAY, "Developer");
    assert!(matches!(
        engine.ledger().record_assignment(late),
        Err(LedgerError::Store(RepoError::NotFound {
            entity: "project",
            id,
        })) if id == cobalt.id
    ));
    assert_eq!(engine.ledger().total_allocated(ada.id), 0);
    assert!(engine.audit_totals().unwrap().is_empty());
}

#[test]
fn concurrent_delete_and_assign_never_strand_capacity() {
    for _ in 0..100 {
        let engine = engine();
        let ada = engine
            .roster()
            .register_engineer(&new_engineer("Ada", None))
            .unwrap();
        let atlas = engine
            .projects()
            .create_project(&new_project("Atlas", ProjectPriority::High))
            .unwrap();
        let barrier = Barrier::new(2);

        let (deleted, proposed) = std::thread::scope(|scope| {
            let delete = scope.spawn(|| {
                barrier.wait();
                engine.projects().delete_project(atlas.id)
            });
            let propose = scope.spawn(|| {
                barrier.wait();
                engine.assignments().propose_assignment(&AssignmentRequest {
                    project_id: atlas.id,
                    engineer_id: ada.id,
                    allocation_percentage: 60,
                    start_date: 0,
                    end_date: MILLIS_PER_DAY,
                    role: "Developer".to_string(),
                })
            });
            (delete.join().unwrap(), propose.join().unwrap())
        });

        let released = deleted.unwrap();
        match proposed {
            Ok(_) => assert_eq!(released, 1),
            Err(err) => {
                assert!(matches!(err, AssignmentError::ProjectNotFound(id) if id == atlas.id));
                assert_eq!(err.code(), "not_found");
                assert_eq!(released, 0);
            }
        }
        assert_eq!(engine.ledger().total_allocated(ada.id), 0);
        assert_eq!(engine.ledger().stored_total(ada.id).unwrap(), 0);
        assert!(engine.audit_totals().unwrap().is_empty());
    }
}

#[test]
fn create_rejects_inverted_dates_and_empty_team() {
    let engine = engine();
    let mut inverted = new_project("Atlas", ProjectPriority::Medium);
    inverted.end_date = inverted.start_date - 1;
    assert!(matches!(
        engine.projects().create_project(&inverted),
        Err(ProjectServiceError::Validation(
            ValidationError::InvalidDateRange { .. }
        ))
    ));

    let mut empty = new_project("Atlas", ProjectPriority::Medium);
    empty.team_size = Some(0);
    assert!(matches!(
        engine.projects().create_project(&empty),
        Err(ProjectServiceError::Validation(ValidationError::ZeroTeamSize))
    ));
}

#[test]
fn status_updates_feed_filters_and_summary() {
    let engine = engine();
    let atlas = engine
        .projects()
        .create_project(&new_project("Atlas", ProjectPriority::High))
        .unwrap();
    engine
        .projects()
        .create_project(&new_project("Borealis", ProjectPriority::Low))
        .unwrap();
    let mut planned = new_project("Cobalt", ProjectPriority::Medium);
    planned.status = None;
    let cobalt = engine.projects().create_project(&planned).unwrap();
    assert_eq!(cobalt.status, ProjectStatus::Planning);

    let paused = engine
        .projects()
        .update_status(atlas.id, ProjectStatus::OnHold)
        .unwrap();
    assert_eq!(paused.status.color(), "error");
    assert_eq!(
        engine.projects().get_project(atlas.id).unwrap().status,
        ProjectStatus::OnHold
    );

    let on_hold = engine
        .projects()
        .filter_projects(&ProjectFilter {
            status: Some(ProjectStatus::OnHold),
            ..ProjectFilter::default()
        })
        .unwrap();
    assert_eq!(on_hold.len(), 1);
    assert_eq!(on_hold[0].id, atlas.id);

    let by_skill = engine
        .projects()
        .filter_projects(&ProjectFilter {
            search: Some("GO".to_string()),
            priority: Some(ProjectPriority::Low),
            ..ProjectFilter::default()
        })
        .unwrap();
    assert_eq!(by_skill.len(), 1);
    assert_eq!(by_skill[0].name, "Borealis");

    assert_eq!(
        engine.projects().summary().unwrap(),
        ProjectSummary {
            total: 3,
            active: 1,
            completed: 0,
            planning: 1,
            on_hold: 1,
        }
    );
}
