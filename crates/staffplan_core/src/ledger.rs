//! Authoritative per-engineer allocation ledger.
//!
//! # Responsibility
//! - Own every active assignment, grouped into one account per engineer.
//! - Commit and remove assignments atomically, writing through to the
//!   durable assignment log.
//! - Answer "how much capacity is committed" for any engineer.
//!
//! # Invariants
//! - For every account: `sum(allocation_percentage) <= max_capacity`, checked
//!   again inside the account lock on every commit and capacity change.
//! - A failed commit or removal leaves both memory and storage unchanged.
//! - Each engineer has its own lock; there is no global lock, so different
//!   engineers never contend.
//! - Lock order: account lock, then the storage connection lock.
//! - Dashmap references are never held while an account lock is taken.
//! - A stored row that is already gone (dropped by a project cascade) counts
//!   as deleted when the ledger removes the matching entry.

use crate::capacity::available_capacity;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::engineer::{validate_max_capacity, Engineer, EngineerId};
use crate::model::project::ProjectId;
use crate::model::validation::ValidationError;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::{RepoError, RepoResult};
use dashmap::DashMap;
use log::{info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug)]
pub enum LedgerError {
    /// The commit-time recheck found less capacity than requested.
    CapacityExceeded {
        engineer_id: EngineerId,
        requested: u32,
        available: u32,
    },
    /// New `max_capacity` would fall below what is already committed.
    CapacityBelowCommitted {
        engineer_id: EngineerId,
        requested: u32,
        committed: u32,
    },
    AssignmentNotFound(AssignmentId),
    UnknownEngineer(EngineerId),
    Validation(ValidationError),
    Store(RepoError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded {
                engineer_id,
                requested,
                available,
            } => write!(
                f,
                "engineer {engineer_id} has {available}% available, cannot allocate {requested}%"
            ),
            Self::CapacityBelowCommitted {
                engineer_id,
                requested,
                committed,
            } => write!(
                f,
                "engineer {engineer_id} has {committed}% committed, cannot lower capacity to {requested}%"
            ),
            Self::AssignmentNotFound(id) => write!(f, "assignment not found: {id}"),
            Self::UnknownEngineer(id) => write!(f, "no ledger account for engineer {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Consistent view of one account, read under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub engineer_id: EngineerId,
    pub max_capacity: u32,
    pub total_allocated: u32,
    pub assignments: Vec<Assignment>,
}

impl AccountSnapshot {
    pub fn available_capacity(&self) -> u32 {
        available_capacity(self.max_capacity, self.total_allocated)
    }
}

#[derive(Debug)]
struct EngineerAccount {
    max_capacity: u32,
    assignments: Vec<Assignment>,
}

impl EngineerAccount {
    fn total_allocated(&self) -> u32 {
        self.assignments
            .iter()
            .map(|assignment| assignment.allocation_percentage)
            .sum()
    }
}

type AccountHandle = Arc<Mutex<EngineerAccount>>;

pub struct AllocationLedger<S: AssignmentRepository> {
    store: S,
    accounts: DashMap<EngineerId, AccountHandle>,
    owners: DashMap<AssignmentId, EngineerId>,
}

impl<S: AssignmentRepository> AllocationLedger<S> {
    /// Creates an empty ledger writing through to `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            accounts: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    /// Rebuilds the ledger from the roster and the stored assignment log.
    ///
    /// # Errors
    /// - `UnknownEngineer` when a stored assignment references an engineer
    ///   missing from `engineers`.
    /// - `Store(InvalidData)` when stored rows already exceed an engineer's
    ///   capacity.
    pub fn hydrate(store: S, engineers: &[Engineer]) -> LedgerResult<Self> {
        let ledger = Self::new(store);
        for engineer in engineers {
            ledger.open_account(engineer.id, engineer.max_capacity)?;
        }

        let rows = ledger.store.list_assignments()?;
        let row_count = rows.len();
        for assignment in rows {
            let account = ledger
                .account(assignment.engineer_id)
                .ok_or(LedgerError::UnknownEngineer(assignment.engineer_id))?;
            ledger.owners.insert(assignment.id, assignment.engineer_id);
            account.lock().assignments.push(assignment);
        }

        for engineer in engineers {
            let Some(account) = ledger.account(engineer.id) else {
                continue;
            };
            let account = account.lock();
            let total = account.total_allocated();
            if total > account.max_capacity {
                return Err(LedgerError::Store(RepoError::InvalidData(format!(
                    "engineer {} has {total}% stored against a capacity of {}%",
                    engineer.id, account.max_capacity
                ))));
            }
        }

        info!(
            "event=ledger_hydrate module=ledger status=ok accounts={} assignments={}",
            ledger.accounts.len(),
            row_count
        );
        Ok(ledger)
    }

    /// Registers an engineer's capacity. Re-opening an existing account is a no-op.
    pub fn open_account(&self, engineer_id: EngineerId, max_capacity: u32) -> LedgerResult<()> {
        validate_max_capacity(max_capacity)?;
        self.accounts.entry(engineer_id).or_insert_with(|| {
            Arc::new(Mutex::new(EngineerAccount {
                max_capacity,
                assignments: Vec::new(),
            }))
        });
        Ok(())
    }

    /// Sum of allocation percentages attributed to the engineer; `0` if none.
    pub fn total_allocated(&self, engineer_id: EngineerId) -> u32 {
        self.account(engineer_id)
            .map(|account| account.lock().total_allocated())
            .unwrap_or(0)
    }

    pub fn max_capacity(&self, engineer_id: EngineerId) -> Option<u32> {
        self.account(engineer_id)
            .map(|account| account.lock().max_capacity)
    }

    /// Fresh read of remaining capacity. May be stale by the time a commit
    /// runs; `record_assignment` rechecks under the lock.
    pub fn available_capacity(&self, engineer_id: EngineerId) -> Option<u32> {
        self.snapshot(engineer_id)
            .map(|snapshot| snapshot.available_capacity())
    }

    pub fn snapshot(&self, engineer_id: EngineerId) -> Option<AccountSnapshot> {
        let account = self.account(engineer_id)?;
        let account = account.lock();
        Some(AccountSnapshot {
            engineer_id,
            max_capacity: account.max_capacity,
            total_allocated: account.total_allocated(),
            assignments: account.assignments.clone(),
        })
    }

    pub fn assignments_for(&self, engineer_id: EngineerId) -> Vec<Assignment> {
        self.account(engineer_id)
            .map(|account| account.lock().assignments.clone())
            .unwrap_or_default()
    }

    pub fn assignments_for_project(&self, project_id: ProjectId) -> Vec<Assignment> {
        self.handles()
            .into_iter()
            .flat_map(|account| {
                account
                    .lock()
                    .assignments
                    .iter()
                    .filter(|assignment| assignment.project_id == project_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn find_assignment(
        &self,
        project_id: ProjectId,
        engineer_id: EngineerId,
    ) -> Option<Assignment> {
        let account = self.account(engineer_id)?;
        let account = account.lock();
        account
            .assignments
            .iter()
            .find(|assignment| assignment.project_id == project_id)
            .cloned()
    }

    /// Commits one assignment if it still fits the engineer's capacity.
    ///
    /// The capacity check, the durable insert and the in-memory push happen
    /// inside the engineer's critical section.
    ///
    /// # Errors
    /// - `Validation` for malformed records or a duplicate (project, engineer) pair.
    /// - `UnknownEngineer` when no account is open.
    /// - `CapacityExceeded` when the recheck fails; state is unchanged.
    /// - `Store` when the durable insert fails; state is unchanged.
    pub fn record_assignment(&self, assignment: Assignment) -> LedgerResult<Assignment> {
        assignment.validate()?;
        let engineer_id = assignment.engineer_id;
        let account = self
            .account(engineer_id)
            .ok_or(LedgerError::UnknownEngineer(engineer_id))?;

        let mut account = account.lock();
        if account
            .assignments
            .iter()
            .any(|existing| existing.project_id == assignment.project_id)
        {
            return Err(LedgerError::Validation(
                ValidationError::DuplicateAssignment {
                    project_id: assignment.project_id,
                    engineer_id,
                },
            ));
        }

        let committed = account.total_allocated();
        let available = available_capacity(account.max_capacity, committed);
        if assignment.allocation_percentage > available {
            warn!(
                "event=assignment_commit module=ledger status=rejected engineer_id={} requested={} available={}",
                engineer_id, assignment.allocation_percentage, available
            );
            return Err(LedgerError::CapacityExceeded {
                engineer_id,
                requested: assignment.allocation_percentage,
                available,
            });
        }

        self.store.insert_assignment(&assignment)?;
        account.assignments.push(assignment.clone());
        self.owners.insert(assignment.id, engineer_id);

        info!(
            "event=assignment_commit module=ledger status=ok engineer_id={} assignment_id={} allocation={} total={} max={}",
            engineer_id,
            assignment.id,
            assignment.allocation_percentage,
            committed + assignment.allocation_percentage,
            account.max_capacity
        );
        Ok(assignment)
    }

    /// Removes one assignment and frees its full percentage immediately.
    pub fn remove_assignment(&self, assignment_id: AssignmentId) -> LedgerResult<Assignment> {
        let engineer_id = self
            .owners
            .get(&assignment_id)
            .map(|entry| *entry.value())
            .ok_or(LedgerError::AssignmentNotFound(assignment_id))?;
        let account = self
            .account(engineer_id)
            .ok_or(LedgerError::AssignmentNotFound(assignment_id))?;

        let mut account = account.lock();
        let index = account
            .assignments
            .iter()
            .position(|assignment| assignment.id == assignment_id)
            .ok_or(LedgerError::AssignmentNotFound(assignment_id))?;

        self.delete_stored(assignment_id)?;
        let removed = account.assignments.remove(index);
        self.owners.remove(&assignment_id);

        info!(
            "event=assignment_remove module=ledger status=ok engineer_id={} assignment_id={} released={} total={}",
            engineer_id,
            assignment_id,
            removed.allocation_percentage,
            account.total_allocated()
        );
        Ok(removed)
    }

    /// Removes every assignment of one project, engineer by engineer.
    ///
    /// Each engineer is released under its own lock; a storage failure stops
    /// the sweep and leaves already-released engineers released. Delete the
    /// project row first: commits racing the sweep then fail their insert
    /// instead of landing behind it.
    pub fn release_project(&self, project_id: ProjectId) -> LedgerResult<Vec<Assignment>> {
        let mut released = Vec::new();
        for account in self.handles() {
            let mut account = account.lock();
            while let Some(index) = account
                .assignments
                .iter()
                .position(|assignment| assignment.project_id == project_id)
            {
                let assignment_id = account.assignments[index].id;
                self.delete_stored(assignment_id)?;
                released.push(account.assignments.remove(index));
                self.owners.remove(&assignment_id);
            }
        }

        info!(
            "event=project_release module=ledger status=ok project_id={} released={}",
            project_id,
            released.len()
        );
        Ok(released)
    }

    /// Changes an engineer's capacity if it still covers committed work.
    ///
    /// `None` keeps the current capacity. `persist` receives the capacity
    /// that will be in effect and runs inside the account lock, before memory
    /// is updated; if it fails the old capacity stays in effect. Writes made
    /// from `persist` are therefore serialized per engineer.
    pub fn set_max_capacity<F, T>(
        &self,
        engineer_id: EngineerId,
        requested: Option<u32>,
        persist: F,
    ) -> LedgerResult<T>
    where
        F: FnOnce(u32) -> RepoResult<T>,
    {
        if let Some(max_capacity) = requested {
            validate_max_capacity(max_capacity)?;
        }
        let account = self
            .account(engineer_id)
            .ok_or(LedgerError::UnknownEngineer(engineer_id))?;

        let mut account = account.lock();
        let max_capacity = requested.unwrap_or(account.max_capacity);
        let committed = account.total_allocated();
        if max_capacity < committed {
            warn!(
                "event=capacity_resize module=ledger status=rejected engineer_id={} requested={} committed={}",
                engineer_id, max_capacity, committed
            );
            return Err(LedgerError::CapacityBelowCommitted {
                engineer_id,
                requested: max_capacity,
                committed,
            });
        }

        let persisted = persist(max_capacity)?;
        let previous = std::mem::replace(&mut account.max_capacity, max_capacity);
        info!(
            "event=capacity_resize module=ledger status=ok engineer_id={} from={} to={}",
            engineer_id, previous, max_capacity
        );
        Ok(persisted)
    }

    /// Recomputes the engineer's total from durable rows.
    pub fn stored_total(&self, engineer_id: EngineerId) -> LedgerResult<u32> {
        Ok(self.store.sum_for_engineer(engineer_id)?)
    }

    fn delete_stored(&self, assignment_id: AssignmentId) -> LedgerResult<()> {
        match self.store.delete_assignment(assignment_id) {
            Ok(()) | Err(RepoError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn account(&self, engineer_id: EngineerId) -> Option<AccountHandle> {
        self.accounts
            .get(&engineer_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn handles(&self) -> Vec<AccountHandle> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
