//! Assignment use-case service: the only entry point that changes allocations.
//!
//! # Responsibility
//! - Validate create/unassign requests and delegate commits to the ledger.
//! - Surface the caller-facing error taxonomy (validation, capacity, not found).
//!
//! # Invariants
//! - Preconditions run in order and stop at the first failure: references
//!   exist, allocation in range, dates ordered, capacity available.
//! - The capacity precheck uses a fresh ledger read; the ledger rechecks at
//!   commit time and its rejection is surfaced without retry.

use crate::capacity::{preview_allocation, AllocationPreview, CapacityError};
use crate::ledger::{AllocationLedger, LedgerError};
use crate::model::assignment::{Assignment, AssignmentStatus};
use crate::model::engineer::{Engineer, EngineerId};
use crate::model::project::ProjectId;
use crate::model::validation::ValidationError;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::engineer_repo::EngineerRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use log::{debug, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Create-assignment input as received from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub project_id: ProjectId,
    pub engineer_id: EngineerId,
    pub allocation_percentage: u32,
    pub start_date: i64,
    pub end_date: i64,
    pub role: String,
}

#[derive(Debug)]
pub enum AssignmentError {
    Validation(ValidationError),
    /// `available` is the largest allocation that would be accepted now.
    CapacityExceeded { requested: u32, available: u32 },
    EngineerNotFound(EngineerId),
    ProjectNotFound(ProjectId),
    AssignmentNotFound {
        project_id: ProjectId,
        engineer_id: EngineerId,
    },
    /// Stored engineer data violates a creation-time invariant.
    Integrity(CapacityError),
    Ledger(LedgerError),
    Repo(RepoError),
}

impl AssignmentError {
    /// Stable category code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::EngineerNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::AssignmentNotFound { .. } => "not_found",
            Self::Integrity(_) | Self::Ledger(_) | Self::Repo(_) => "internal",
        }
    }
}

impl Display for AssignmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CapacityExceeded {
                requested,
                available,
            } => write!(
                f,
                "cannot assign {requested}%: exceeds available capacity, maximum {available}%"
            ),
            Self::EngineerNotFound(id) => write!(f, "engineer not found: {id}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::AssignmentNotFound {
                project_id,
                engineer_id,
            } => write!(
                f,
                "no assignment for engineer {engineer_id} on project {project_id}"
            ),
            Self::Integrity(err) => write!(f, "{err}"),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssignmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Integrity(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for AssignmentError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AssignmentError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<CapacityError> for AssignmentError {
    fn from(value: CapacityError) -> Self {
        Self::Integrity(value)
    }
}

/// Validates and applies allocation changes on top of the ledger.
pub struct AssignmentValidator<E, P, A>
where
    E: EngineerRepository,
    P: ProjectRepository,
    A: AssignmentRepository,
{
    engineers: E,
    projects: P,
    ledger: Arc<AllocationLedger<A>>,
}

impl<E, P, A> AssignmentValidator<E, P, A>
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

    /// Proposes a new allocation; returns the committed record on acceptance.
    ///
    /// # Errors
    /// - `EngineerNotFound` / `ProjectNotFound` for missing references.
    /// - `Validation` for out-of-range allocation, inverted dates, blank role
    ///   or a duplicate (project, engineer) pair.
    /// - `CapacityExceeded` when the precheck or the commit-time recheck fails.
    pub fn propose_assignment(
        &self,
        request: &AssignmentRequest,
    ) -> Result<Assignment, AssignmentError> {
        let engineer = self.require_engineer(request.engineer_id)?;
        self.projects
            .get_project(request.project_id)?
            .ok_or(AssignmentError::ProjectNotFound(request.project_id))?;

        let assignment = Assignment::new(
            request.project_id,
            request.engineer_id,
            request.allocation_percentage,
            request.start_date,
            request.end_date,
            request.role.trim(),
        );
        assignment.validate()?;

        let available = self.fresh_available(&engineer)?;
        if assignment.allocation_percentage > available {
            debug!(
                "event=assignment_propose module=service status=rejected engineer_id={} requested={} available={}",
                engineer.id, assignment.allocation_percentage, available
            );
            return Err(AssignmentError::CapacityExceeded {
                requested: assignment.allocation_percentage,
                available,
            });
        }

        let committed = self
            .ledger
            .record_assignment(assignment)
            .map_err(ledger_error)?;
        info!(
            "event=assignment_propose module=service status=ok assignment_id={} project_id={} engineer_id={}",
            committed.id, committed.project_id, committed.engineer_id
        );
        Ok(committed)
    }

    /// Removes the engineer's assignment on the project.
    pub fn propose_unassign(
        &self,
        project_id: ProjectId,
        engineer_id: EngineerId,
    ) -> Result<Assignment, AssignmentError> {
        let not_found = || AssignmentError::AssignmentNotFound {
            project_id,
            engineer_id,
        };
        let assignment = self
            .ledger
            .find_assignment(project_id, engineer_id)
            .ok_or_else(not_found)?;

        match self.ledger.remove_assignment(assignment.id) {
            Ok(removed) => Ok(removed),
            Err(LedgerError::AssignmentNotFound(_)) => Err(not_found()),
            Err(other) => Err(ledger_error(other)),
        }
    }

    /// Capacity figures if `requested` were added to the engineer now.
    pub fn preview(
        &self,
        engineer_id: EngineerId,
        requested: u32,
    ) -> Result<AllocationPreview, AssignmentError> {
        let engineer = self.require_engineer(engineer_id)?;
        let snapshot = self
            .ledger
            .snapshot(engineer.id)
            .ok_or(AssignmentError::EngineerNotFound(engineer_id))?;
        Ok(preview_allocation(
            snapshot.max_capacity,
            snapshot.total_allocated,
            requested,
        )?)
    }

    /// Status of the engineer's assignment on the project, derived at `now_ms`.
    pub fn assignment_status(
        &self,
        project_id: ProjectId,
        engineer_id: EngineerId,
        now_ms: i64,
    ) -> Result<AssignmentStatus, AssignmentError> {
        self.ledger
            .find_assignment(project_id, engineer_id)
            .map(|assignment| assignment.status_at(now_ms))
            .ok_or(AssignmentError::AssignmentNotFound {
                project_id,
                engineer_id,
            })
    }

    fn require_engineer(&self, engineer_id: EngineerId) -> Result<Engineer, AssignmentError> {
        let engineer = self
            .engineers
            .get_engineer(engineer_id)?
            .ok_or(AssignmentError::EngineerNotFound(engineer_id))?;
        self.ledger
            .open_account(engineer.id, engineer.max_capacity)
            .map_err(ledger_error)?;
        Ok(engineer)
    }

    fn fresh_available(&self, engineer: &Engineer) -> Result<u32, AssignmentError> {
        self.ledger
            .available_capacity(engineer.id)
            .ok_or(AssignmentError::EngineerNotFound(engineer.id))
    }
}

fn ledger_error(err: LedgerError) -> AssignmentError {
    match err {
        LedgerError::CapacityExceeded {
            requested,
            available,
            ..
        } => AssignmentError::CapacityExceeded {
            requested,
            available,
        },
        LedgerError::UnknownEngineer(id) => AssignmentError::EngineerNotFound(id),
        LedgerError::Validation(err) => AssignmentError::Validation(err),
        // The referenced row vanished between the precheck and the insert.
        LedgerError::Store(RepoError::NotFound {
            entity: "project",
            id,
        }) => AssignmentError::ProjectNotFound(id),
        LedgerError::Store(RepoError::NotFound {
            entity: "engineer",
            id,
        }) => AssignmentError::EngineerNotFound(id),
        other => AssignmentError::Ledger(other),
    }
}
