//! Engine wiring: one shared connection, one ledger, four services.
//!
//! # Invariants
//! - The ledger is hydrated from storage before any service is handed out.
//! - All services share the same ledger instance.

use crate::config::EngineConfig;
use crate::db::{open_db, open_db_in_memory, share, DbError, SharedConnection};
use crate::ledger::{AllocationLedger, LedgerError};
use crate::model::engineer::EngineerId;
use crate::repo::assignment_repo::SqliteAssignmentRepository;
use crate::repo::engineer_repo::{EngineerRepository, SqliteEngineerRepository};
use crate::repo::project_repo::SqliteProjectRepository;
use crate::repo::RepoError;
use crate::service::assignment_service::AssignmentValidator;
use crate::service::dashboard_service::DashboardService;
use crate::service::project_service::ProjectService;
use crate::service::roster_service::RosterService;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type SqliteLedger = AllocationLedger<SqliteAssignmentRepository>;
pub type SqliteAssignmentValidator = AssignmentValidator<
    SqliteEngineerRepository,
    SqliteProjectRepository,
    SqliteAssignmentRepository,
>;
pub type SqliteRosterService = RosterService<SqliteEngineerRepository, SqliteAssignmentRepository>;
pub type SqliteProjectService = ProjectService<SqliteProjectRepository, SqliteAssignmentRepository>;
pub type SqliteDashboardService = DashboardService<
    SqliteEngineerRepository,
    SqliteProjectRepository,
    SqliteAssignmentRepository,
>;

#[derive(Debug)]
pub enum EngineError {
    Db(DbError),
    Repo(RepoError),
    Ledger(LedgerError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Ledger(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Ledger(err) => Some(err),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<LedgerError> for EngineError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

pub struct StaffingEngine {
    engineers: SqliteEngineerRepository,
    ledger: Arc<SqliteLedger>,
    assignments: SqliteAssignmentValidator,
    roster: SqliteRosterService,
    projects: SqliteProjectService,
    dashboard: SqliteDashboardService,
}

impl StaffingEngine {
    /// Opens the database named by `config`, or an in-memory one.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Self::open(share(conn))
    }

    /// Builds the engine over an already migrated connection.
    pub fn open(conn: SharedConnection) -> Result<Self, EngineError> {
        let engineers = SqliteEngineerRepository::new(Arc::clone(&conn));
        let projects = SqliteProjectRepository::new(Arc::clone(&conn));
        let store = SqliteAssignmentRepository::new(conn);

        let roster = engineers.list_engineers()?;
        let ledger = Arc::new(AllocationLedger::hydrate(store, &roster)?);

        info!(
            "event=engine_open module=engine status=ok engineers={}",
            roster.len()
        );
        Ok(Self {
            assignments: AssignmentValidator::new(
                engineers.clone(),
                projects.clone(),
                Arc::clone(&ledger),
            ),
            roster: RosterService::new(engineers.clone(), Arc::clone(&ledger)),
            projects: ProjectService::new(projects.clone(), Arc::clone(&ledger)),
            dashboard: DashboardService::new(engineers.clone(), projects, Arc::clone(&ledger)),
            engineers,
            ledger,
        })
    }

    pub fn ledger(&self) -> &SqliteLedger {
        &self.ledger
    }

    pub fn assignments(&self) -> &SqliteAssignmentValidator {
        &self.assignments
    }

    pub fn roster(&self) -> &SqliteRosterService {
        &self.roster
    }

    pub fn projects(&self) -> &SqliteProjectService {
        &self.projects
    }

    pub fn dashboard(&self) -> &SqliteDashboardService {
        &self.dashboard
    }

    /// Engineers whose in-memory total differs from the sum of stored rows.
    pub fn audit_totals(&self) -> Result<Vec<EngineerId>, EngineError> {
        let mut drifted = Vec::new();
        for engineer in self.engineers.list_engineers()? {
            let stored = self.ledger.stored_total(engineer.id)?;
            let cached = self.ledger.total_allocated(engineer.id);
            if stored != cached {
                warn!(
                    "event=ledger_audit module=engine status=error engineer_id={} cached={} stored={}",
                    engineer.id, cached, stored
                );
                drifted.push(engineer.id);
            }
        }
        Ok(drifted)
    }
}
