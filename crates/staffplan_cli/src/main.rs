//! Command-line front end for the allocation engine.
//!
//! # Responsibility
//! - Open the configured database and print dashboards as JSON.
//! - Run a self-contained in-memory demo of the allocation rules.
//!
//! Usage: `staffplan_cli [ping|capacity|availability|projects|demo]`

use log::error;
use serde::Serialize;
use staffplan_core::model::engineer::parse_skill_list;
use staffplan_core::{
    init_logging, now_epoch_ms, open_db_in_memory, share, AssignmentRequest, EngineConfig,
    NewEngineer, NewProject, ProjectFilter, Seniority, StaffingEngine,
};
use std::error::Error;
use std::process::ExitCode;

const DAY_MS: i64 = staffplan_core::timeline::MILLIS_PER_DAY;

fn main() -> ExitCode {
    let command = std::env::args().nth(1).unwrap_or_else(|| "ping".to_string());
    match run(&command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error command={command}");
            eprintln!("staffplan: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &str) -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::from_env()?;
    if let Some(log) = &config.log {
        init_logging(log)?;
    }

    match command {
        "ping" => {
            println!("staffplan_core ping={}", staffplan_core::ping());
            println!("staffplan_core version={}", staffplan_core::core_version());
        }
        "capacity" => {
            let engine = StaffingEngine::from_config(&config)?;
            print_json(&engine.dashboard().engineer_capacity()?)?;
        }
        "availability" => {
            let engine = StaffingEngine::from_config(&config)?;
            print_json(&engine.dashboard().engineer_availability(now_epoch_ms())?)?;
        }
        "projects" => {
            let engine = StaffingEngine::from_config(&config)?;
            print_json(&engine.projects().filter_projects(&ProjectFilter::default())?)?;
            print_json(&engine.projects().summary()?)?;
        }
        "demo" => demo()?,
        other => return Err(format!("unknown command `{other}`").into()),
    }
    Ok(())
}

fn demo() -> Result<(), Box<dyn Error>> {
    let engine = StaffingEngine::open(share(open_db_in_memory()?))?;
    let now = now_epoch_ms();

    let ada = engine.roster().register_engineer(&NewEngineer {
        name: "Ada".to_string(),
        skills: parse_skill_list("Rust, SQL"),
        seniority: Seniority::Senior,
        department: "Platform".to_string(),
        max_capacity: None,
    })?;
    let project = engine.projects().create_project(&NewProject {
        name: "Ledger rewrite".to_string(),
        description: None,
        required_skills: vec!["rust".to_string()],
        status: None,
        priority: None,
        team_size: Some(2),
        start_date: now - 5 * DAY_MS,
        end_date: now + 5 * DAY_MS,
    })?;
    let side_project = engine.projects().create_project(&NewProject {
        name: "Reporting".to_string(),
        description: None,
        required_skills: Vec::new(),
        status: None,
        priority: None,
        team_size: None,
        start_date: now,
        end_date: now + 30 * DAY_MS,
    })?;

    let request = |project_id, allocation_percentage| AssignmentRequest {
        project_id,
        engineer_id: ada.id,
        allocation_percentage,
        start_date: now - 5 * DAY_MS,
        end_date: now + 5 * DAY_MS,
        role: "Developer".to_string(),
    };

    engine.assignments().propose_assignment(&request(project.id, 80))?;
    match engine
        .assignments()
        .propose_assignment(&request(side_project.id, 25))
    {
        Ok(_) => println!("unexpected: 25% accepted"),
        Err(err) => println!("rejected ({}): {err}", err.code()),
    }

    print_json(&engine.dashboard().engineer_capacity()?)?;
    print_json(&engine.dashboard().engineer_timeline(ada.id, now)?)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
