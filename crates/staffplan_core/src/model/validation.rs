//! Field-level validation errors shared by all domain records.
//!
//! # Invariants
//! - Every write path validates before any state (ledger or storage) changes.
//! - Read paths re-validate persisted rows and surface violations as
//!   invalid data instead of masking them.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Malformed input rejected before it can affect the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty after trim.
    BlankName,
    /// Assignment role label is empty after trim.
    BlankRole,
    /// Engineer `max_capacity` outside `[1, 100]`.
    MaxCapacityOutOfRange(u32),
    /// Assignment `allocation_percentage` outside `[1, 100]`.
    AllocationOutOfRange(u32),
    /// `start_date` is later than `end_date` (epoch milliseconds).
    InvalidDateRange { start: i64, end: i64 },
    /// Project team size target must be at least one.
    ZeroTeamSize,
    /// Engineer already holds an assignment on this project.
    DuplicateAssignment { project_id: Uuid, engineer_id: Uuid },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::BlankRole => write!(f, "role must not be blank"),
            Self::MaxCapacityOutOfRange(value) => {
                write!(f, "max capacity must be within 1..=100, got {value}")
            }
            Self::AllocationOutOfRange(value) => {
                write!(f, "allocation percentage must be within 1..=100, got {value}")
            }
            Self::InvalidDateRange { start, end } => {
                write!(f, "start date {start} must not be after end date {end}")
            }
            Self::ZeroTeamSize => write!(f, "team size must be at least 1"),
            Self::DuplicateAssignment {
                project_id,
                engineer_id,
            } => write!(
                f,
                "engineer {engineer_id} is already assigned to project {project_id}"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn ensure_date_range(start: i64, end: i64) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvalidDateRange { start, end });
    }
    Ok(())
}

pub(crate) fn ensure_not_blank(value: &str, err: ValidationError) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(err);
    }
    Ok(())
}
