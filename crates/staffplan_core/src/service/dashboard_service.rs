//! Read-side dashboard queries.
//!
//! # Responsibility
//! - Join roster, projects and ledger snapshots into display rows.
//! - Derive utilization, status, progress and days remaining per request.
//!
//! # Invariants
//! - Never mutates the ledger.
//! - Capacity figures of one engineer come from a single ledger snapshot,
//!   so `available + current_allocation == max_capacity` whenever the
//!   engineer is not overcommitted.
//! - Derived fields are recomputed from `now_ms` on every call.

use crate::capacity::{
    CapacityError, CapacitySnapshot, UtilizationBucket, HIGH_UTILIZATION_THRESHOLD,
};
use crate::ledger::{AccountSnapshot, AllocationLedger, LedgerError};
use crate::model::assignment::{Assignment, AssignmentId, AssignmentStatus};
use crate::model::engineer::{Engineer, EngineerId, Seniority};
use crate::model::project::{Project, ProjectId};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::engineer_repo::EngineerRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use crate::timeline::{days_remaining, progress_percent, DaysRemaining};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Row of the "list engineer capacity" query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerCapacityRow {
    pub id: EngineerId,
    pub name: String,
    pub seniority: Seniority,
    pub department: String,
    pub max_capacity: u32,
    pub total_allocated: u32,
    pub available_capacity: u32,
    pub utilization_percent: f64,
    pub bucket: UtilizationBucket,
    pub bucket_color: &'static str,
}

/// One assignment as shown on availability and timeline views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: AssignmentId,
    pub project_id: ProjectId,
    /// `None` when the project row is gone but the assignment is still cached.
    pub project_name: Option<String>,
    pub role: String,
    pub allocation_percentage: u32,
    pub start_date: i64,
    pub end_date: i64,
    pub status: AssignmentStatus,
    pub progress_percent: f64,
    pub days_remaining: DaysRemaining,
    pub days_remaining_label: String,
}

impl AssignmentView {
    fn derive(assignment: &Assignment, project: Option<&Project>, now_ms: i64) -> Self {
        let remaining = days_remaining(assignment.end_date, now_ms);
        Self {
            id: assignment.id,
            project_id: assignment.project_id,
            project_name: project.map(|project| project.name.clone()),
            role: assignment.role.clone(),
            allocation_percentage: assignment.allocation_percentage,
            start_date: assignment.start_date,
            end_date: assignment.end_date,
            status: assignment.status_at(now_ms),
            progress_percent: progress_percent(assignment.start_date, assignment.end_date, now_ms),
            days_remaining: remaining,
            days_remaining_label: remaining.to_string(),
        }
    }
}

/// Row of the "list engineer availability" dashboard query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerAvailabilityRow {
    pub id: EngineerId,
    pub name: String,
    pub department: String,
    pub skills: Vec<String>,
    /// Available capacity in percent.
    pub available: u32,
    pub current_allocation: u32,
    pub utilization_percent: f64,
    pub assignments: Vec<AssignmentView>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub total: usize,
    /// Engineers at or below the high-utilization threshold.
    pub available: usize,
    pub high_utilization: usize,
}

/// An engineer's own view of their assignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineerTimeline {
    pub engineer_id: EngineerId,
    pub name: String,
    pub capacity: CapacitySnapshot,
    pub assignments: Vec<AssignmentView>,
}

#[derive(Debug)]
pub enum DashboardError {
    EngineerNotFound(EngineerId),
    Integrity(CapacityError),
    Ledger(LedgerError),
    Repo(RepoError),
}

impl Display for DashboardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EngineerNotFound(id) => write!(f, "engineer not found: {id}"),
            Self::Integrity(err) => write!(f, "{err}"),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DashboardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EngineerNotFound(_) => None,
            Self::Integrity(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<CapacityError> for DashboardError {
    fn from(value: CapacityError) -> Self {
        Self::Integrity(value)
    }
}

impl From<LedgerError> for DashboardError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<RepoError> for DashboardError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub struct DashboardService<E, P, A>
where
    E: EngineerRepository,
    P: ProjectRepository,
    A: AssignmentRepository,
{
    engineers: E,
    projects: P,
    ledger: Arc<AllocationLedger<A>>,
}

impl<E, P, A> DashboardService<E, P, A>
where
    E: EngineerRepository,
    P: ProjectRepository,
    A: AssignmentRepository,
{
    pub fn new(engineers: E, projects: P, ledger: Arc<AllocationLedger<A>>) -> Self {
        Self {
            engineers,
            projects,
            ledger,
        }
    }

    /// Capacity figures for every engineer, ordered by name.
    pub fn engineer_capacity(&self) -> Result<Vec<EngineerCapacityRow>, DashboardError> {
        self.engineers
            .list_engineers()?
            .into_iter()
            .map(|engineer| {
                let account = self.account(&engineer)?;
                let capacity =
                    CapacitySnapshot::derive(account.max_capacity, account.total_allocated)?;
                Ok(EngineerCapacityRow {
                    id: engineer.id,
                    name: engineer.name,
                    seniority: engineer.seniority,
                    department: engineer.department,
                    max_capacity: capacity.max_capacity,
                    total_allocated: capacity.total_allocated,
                    available_capacity: capacity.available_capacity,
                    utilization_percent: capacity.utilization_percent,
                    bucket: capacity.bucket,
                    bucket_color: capacity.bucket.color(),
                })
            })
            .collect()
    }

    /// Availability rows with each engineer's assignments resolved at `now_ms`.
    pub fn engineer_availability(
        &self,
        now_ms: i64,
    ) -> Result<Vec<EngineerAvailabilityRow>, DashboardError> {
        let projects = self.project_index()?;
        self.engineers
            .list_engineers()?
            .into_iter()
            .map(|engineer| {
                let account = self.account(&engineer)?;
                let capacity =
                    CapacitySnapshot::derive(account.max_capacity, account.total_allocated)?;
                Ok(EngineerAvailabilityRow {
                    id: engineer.id,
                    name: engineer.name,
                    department: engineer.department,
                    skills: engineer.skills,
                    available: capacity.available_capacity,
                    current_allocation: capacity.total_allocated,
                    utilization_percent: capacity.utilization_percent,
                    assignments: views(&account.assignments, &projects, now_ms),
                })
            })
            .collect()
    }

    pub fn availability_summary(&self) -> Result<AvailabilitySummary, DashboardError> {
        let rows = self.engineer_capacity()?;
        let high_utilization = rows
            .iter()
            .filter(|row| row.utilization_percent > HIGH_UTILIZATION_THRESHOLD)
            .count();
        Ok(AvailabilitySummary {
            total: rows.len(),
            available: rows.len() - high_utilization,
            high_utilization,
        })
    }

    /// The engineer dashboard: own assignments ordered by start date.
    pub fn engineer_timeline(
        &self,
        engineer_id: EngineerId,
        now_ms: i64,
    ) -> Result<EngineerTimeline, DashboardError> {
        let engineer = self
            .engineers
            .get_engineer(engineer_id)?
            .ok_or(DashboardError::EngineerNotFound(engineer_id))?;
        let account = self.account(&engineer)?;
        let capacity = CapacitySnapshot::derive(account.max_capacity, account.total_allocated)?;

        let mut assignments = account.assignments;
        assignments.sort_by_key(|assignment| (assignment.start_date, assignment.end_date));
        let projects = self.project_index()?;

        Ok(EngineerTimeline {
            engineer_id,
            name: engineer.name,
            capacity,
            assignments: views(&assignments, &projects, now_ms),
        })
    }

    fn account(&self, engineer: &Engineer) -> Result<AccountSnapshot, DashboardError> {
        self.ledger
            .open_account(engineer.id, engineer.max_capacity)?;
        self.ledger
            .snapshot(engineer.id)
            .ok_or(DashboardError::EngineerNotFound(engineer.id))
    }

    fn project_index(&self) -> Result<HashMap<ProjectId, Project>, DashboardError> {
        Ok(self
            .projects
            .list_projects()?
            .into_iter()
            .map(|project| (project.id, project))
            .collect())
    }
}

fn views(
    assignments: &[Assignment],
    projects: &HashMap<ProjectId, Project>,
    now_ms: i64,
) -> Vec<AssignmentView> {
    assignments
        .iter()
        .map(|assignment| {
            AssignmentView::derive(assignment, projects.get(&assignment.project_id), now_ms)
        })
        .collect()
}
