//! Engineer registration and profile updates.
//!
//! # Invariants
//! - `max_capacity` is validated at registration, so utilization is always
//!   defined for stored engineers.
//! - Every profile write goes through the engineer's ledger account lock, so
//!   a capacity change can never undercut committed allocations.

use crate::ledger::{AllocationLedger, LedgerError};
use crate::model::engineer::{
    normalize_skills, Engineer, EngineerId, Seniority, DEFAULT_MAX_CAPACITY,
};
use crate::model::validation::ValidationError;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::engineer_repo::EngineerRepository;
use crate::repo::RepoError;
use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEngineer {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub seniority: Seniority,
    #[serde(default)]
    pub department: String,
    /// Defaults to full time when omitted.
    pub max_capacity: Option<u32>,
}

/// Partial profile edit; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub seniority: Option<Seniority>,
    pub department: Option<String>,
    pub max_capacity: Option<u32>,
}

impl ProfileUpdate {
    /// Applies every field except `max_capacity`, which the ledger decides.
    fn apply(&self, engineer: &mut Engineer) {
        if let Some(name) = &self.name {
            engineer.name = name.trim().to_string();
        }
        if let Some(skills) = &self.skills {
            engineer.skills = normalize_skills(skills);
        }
        if let Some(seniority) = self.seniority {
            engineer.seniority = seniority;
        }
        if let Some(department) = &self.department {
            engineer.department = department.trim().to_string();
        }
    }
}

#[derive(Debug)]
pub enum RosterError {
    Validation(ValidationError),
    EngineerNotFound(EngineerId),
    CapacityBelowCommitted { requested: u32, committed: u32 },
    Ledger(LedgerError),
    Repo(RepoError),
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::EngineerNotFound(id) => write!(f, "engineer not found: {id}"),
            Self::CapacityBelowCommitted {
                requested,
                committed,
            } => write!(
                f,
                "max capacity {requested}% is below the {committed}% already allocated"
            ),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RosterError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for RosterError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "engineer",
                id,
            } => Self::EngineerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<LedgerError> for RosterError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Validation(err) => Self::Validation(err),
            LedgerError::UnknownEngineer(id) => Self::EngineerNotFound(id),
            LedgerError::CapacityBelowCommitted {
                requested,
                committed,
                ..
            } => Self::CapacityBelowCommitted {
                requested,
                committed,
            },
            LedgerError::Store(err) => err.into(),
            other => Self::Ledger(other),
        }
    }
}

pub struct RosterService<E: EngineerRepository, A: AssignmentRepository> {
    engineers: E,
    ledger: Arc<AllocationLedger<A>>,
}

impl<E: EngineerRepository, A: AssignmentRepository> RosterService<E, A> {
    pub fn new(engineers: E, ledger: Arc<AllocationLedger<A>>) -> Self {
        Self { engineers, ledger }
    }

    /// Registers an engineer and opens their ledger account.
    pub fn register_engineer(&self, input: &NewEngineer) -> Result<Engineer, RosterError> {
        let engineer = Engineer {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            skills: normalize_skills(&input.skills),
            seniority: input.seniority,
            department: input.department.trim().to_string(),
            max_capacity: input.max_capacity.unwrap_or(DEFAULT_MAX_CAPACITY),
        };
        engineer.validate()?;

        self.engineers.create_engineer(&engineer)?;
        self.ledger
            .open_account(engineer.id, engineer.max_capacity)?;

        info!(
            "event=engineer_register module=service status=ok engineer_id={} max_capacity={}",
            engineer.id, engineer.max_capacity
        );
        Ok(engineer)
    }

    /// Applies a profile edit.
    ///
    /// The row is re-read and written inside the engineer's account lock, so
    /// concurrent edits to different fields both survive.
    ///
    /// # Errors
    /// - `CapacityBelowCommitted` when a lower `max_capacity` would not cover
    ///   current allocations; nothing is written.
    pub fn update_profile(
        &self,
        engineer_id: EngineerId,
        update: &ProfileUpdate,
    ) -> Result<Engineer, RosterError> {
        let current = self.get_engineer(engineer_id)?;
        self.ledger
            .open_account(current.id, current.max_capacity)?;

        let engineer =
            self.ledger
                .set_max_capacity(engineer_id, update.max_capacity, |max_capacity| {
                    let mut engineer = self.engineers.get_engineer(engineer_id)?.ok_or(
                        RepoError::NotFound {
                            entity: "engineer",
                            id: engineer_id,
                        },
                    )?;
                    update.apply(&mut engineer);
                    engineer.max_capacity = max_capacity;
                    engineer.validate()?;
                    self.engineers.update_engineer(&engineer)?;
                    Ok(engineer)
                })?;
        Ok(engineer)
    }

    pub fn get_engineer(&self, engineer_id: EngineerId) -> Result<Engineer, RosterError> {
        self.engineers
            .get_engineer(engineer_id)?
            .ok_or(RosterError::EngineerNotFound(engineer_id))
    }

    pub fn list_engineers(&self) -> Result<Vec<Engineer>, RosterError> {
        Ok(self.engineers.list_engineers()?)
    }
}
