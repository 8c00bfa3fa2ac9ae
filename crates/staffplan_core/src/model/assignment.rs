//! Assignment domain model.
//!
//! # Responsibility
//! - Define the allocation record that the ledger owns per engineer.
//! - Derive lifecycle status from the date range at read time.
//!
//! # Invariants
//! - `allocation_percentage` is within `[1, 100]`.
//! - `start_date <= end_date`.
//! - Status is never stored; it is recomputed from `now` on every read.
//! - Removal is a hard delete; there is no `Unassigned` status.

use super::engineer::EngineerId;
use super::project::ProjectId;
use super::validation::{ensure_date_range, ensure_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_ALLOCATION_PERCENTAGE: u32 = 1;
pub const MAX_ALLOCATION_PERCENTAGE: u32 = 100;

pub type AssignmentId = Uuid;

/// Lifecycle status derived from `(start_date, end_date, now)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// `now < start_date`.
    Pending,
    /// `start_date <= now <= end_date`.
    Active,
    /// `now > end_date`.
    Completed,
}

/// One engineer's committed share of capacity on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub project_id: ProjectId,
    pub engineer_id: EngineerId,
    pub allocation_percentage: u32,
    /// Unix epoch milliseconds.
    pub start_date: i64,
    /// Unix epoch milliseconds.
    pub end_date: i64,
    pub role: String,
}

impl Assignment {
    /// Creates an unvalidated assignment with a generated ID.
    pub fn new(
        project_id: ProjectId,
        engineer_id: EngineerId,
        allocation_percentage: u32,
        start_date: i64,
        end_date: i64,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            engineer_id,
            allocation_percentage,
            start_date,
            end_date,
            role: role.into(),
        }
    }

    /// Checks field invariants in a fixed order: allocation, dates, role.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_allocation(self.allocation_percentage)?;
        ensure_date_range(self.start_date, self.end_date)?;
        ensure_not_blank(&self.role, ValidationError::BlankRole)
    }

    /// Derives status at `now_ms`. Both range ends are inclusive for `Active`.
    pub fn status_at(&self, now_ms: i64) -> AssignmentStatus {
        if now_ms < self.start_date {
            AssignmentStatus::Pending
        } else if now_ms > self.end_date {
            AssignmentStatus::Completed
        } else {
            AssignmentStatus::Active
        }
    }
}

pub fn validate_allocation(value: u32) -> Result<(), ValidationError> {
    if !(MIN_ALLOCATION_PERCENTAGE..=MAX_ALLOCATION_PERCENTAGE).contains(&value) {
        return Err(ValidationError::AllocationOutOfRange(value));
    }
    Ok(())
}
