//! Capacity and utilization derivations.
//!
//! # Responsibility
//! - Derive available capacity, utilization percent and load bucket from raw
//!   `(total_allocated, max_capacity)` totals.
//!
//! # Invariants
//! - Every function is pure and safe to call concurrently without locking.
//! - Available capacity is clamped at zero.
//! - Utilization always uses `max_capacity` as denominator.
//! - Bucket thresholds are evaluated top-down: `>90`, `>70`, `>50`, else.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Utilization at or below this value counts as "available" on summaries.
pub const HIGH_UTILIZATION_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// `max_capacity == 0`; prevented at engineer creation.
    DivisionUndefined,
}

impl Display for CapacityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DivisionUndefined => {
                write!(f, "utilization is undefined for an engineer with zero max capacity")
            }
        }
    }
}

impl Error for CapacityError {}

/// Load tier used for dashboard badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationBucket {
    Overloaded,
    HighLoad,
    Moderate,
    Available,
}

impl UtilizationBucket {
    pub fn label(self) -> &'static str {
        match self {
            Self::Overloaded => "Overloaded",
            Self::HighLoad => "High Load",
            Self::Moderate => "Moderate",
            Self::Available => "Available",
        }
    }

    /// Fixed badge color, independent of any rendering toolkit.
    pub fn color(self) -> &'static str {
        match self {
            Self::Overloaded => "#f44336",
            Self::HighLoad => "#ff9800",
            Self::Moderate => "#2196f3",
            Self::Available => "#4caf50",
        }
    }
}

/// `max(0, max_capacity - total_allocated)`.
pub fn available_capacity(max_capacity: u32, total_allocated: u32) -> u32 {
    max_capacity.saturating_sub(total_allocated)
}

/// `total_allocated / max_capacity * 100`.
///
/// # Errors
/// - `DivisionUndefined` when `max_capacity == 0`.
pub fn utilization_percent(total_allocated: u32, max_capacity: u32) -> Result<f64, CapacityError> {
    if max_capacity == 0 {
        return Err(CapacityError::DivisionUndefined);
    }
    Ok(f64::from(total_allocated) * 100.0 / f64::from(max_capacity))
}

pub fn utilization_bucket(percent: f64) -> UtilizationBucket {
    if percent > 90.0 {
        UtilizationBucket::Overloaded
    } else if percent > 70.0 {
        UtilizationBucket::HighLoad
    } else if percent > 50.0 {
        UtilizationBucket::Moderate
    } else {
        UtilizationBucket::Available
    }
}

/// All capacity figures for one engineer, derived together so they agree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    pub max_capacity: u32,
    pub total_allocated: u32,
    pub available_capacity: u32,
    pub utilization_percent: f64,
    pub bucket: UtilizationBucket,
}

impl CapacitySnapshot {
    pub fn derive(max_capacity: u32, total_allocated: u32) -> Result<Self, CapacityError> {
        let utilization = utilization_percent(total_allocated, max_capacity)?;
        Ok(Self {
            max_capacity,
            total_allocated,
            available_capacity: available_capacity(max_capacity, total_allocated),
            utilization_percent: utilization,
            bucket: utilization_bucket(utilization),
        })
    }

    /// Whether this engineer counts as high-utilization on summaries.
    pub fn is_high_utilization(&self) -> bool {
        self.utilization_percent > HIGH_UTILIZATION_THRESHOLD
    }
}

/// What an engineer's load would look like if `requested` were added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPreview {
    pub requested: u32,
    pub current_utilization_percent: f64,
    pub projected_utilization_percent: f64,
    pub projected_bucket: UtilizationBucket,
    /// Largest allocation that would currently be accepted.
    pub max_allowed: u32,
    pub fits: bool,
}

pub fn preview_allocation(
    max_capacity: u32,
    total_allocated: u32,
    requested: u32,
) -> Result<AllocationPreview, CapacityError> {
    let current = utilization_percent(total_allocated, max_capacity)?;
    let projected = utilization_percent(total_allocated.saturating_add(requested), max_capacity)?;
    let max_allowed = available_capacity(max_capacity, total_allocated);
    Ok(AllocationPreview {
        requested,
        current_utilization_percent: current,
        projected_utilization_percent: projected,
        projected_bucket: utilization_bucket(projected),
        max_allowed,
        fits: requested > 0 && requested <= max_allowed,
    })
}
