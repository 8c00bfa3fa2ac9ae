//! Capacity allocation engine for staffing engineers onto projects.
//! This crate is the single source of truth for allocation invariants.

pub mod capacity;
pub mod config;
pub mod db;
pub mod engine;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timeline;

pub use capacity::{
    available_capacity, utilization_bucket, utilization_percent, AllocationPreview,
    CapacityError, CapacitySnapshot, UtilizationBucket,
};
pub use config::{ConfigError, EngineConfig, LogConfig};
pub use db::{open_db, open_db_in_memory, share, DbError, SharedConnection};
pub use engine::{EngineError, StaffingEngine};
pub use ledger::{AccountSnapshot, AllocationLedger, LedgerError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::assignment::{Assignment, AssignmentId, AssignmentStatus};
pub use model::engineer::{Engineer, EngineerId, Seniority};
pub use model::project::{Project, ProjectId, ProjectPriority, ProjectStatus};
pub use model::validation::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::{AssignmentError, AssignmentRequest, AssignmentValidator};
pub use service::dashboard_service::{
    AssignmentView, AvailabilitySummary, DashboardError, EngineerAvailabilityRow,
    EngineerCapacityRow, EngineerTimeline,
};
pub use service::project_service::{NewProject, ProjectFilter, ProjectServiceError, ProjectSummary};
pub use service::roster_service::{NewEngineer, ProfileUpdate, RosterError};
pub use timeline::{days_remaining, now_epoch_ms, progress_percent, DaysRemaining};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
