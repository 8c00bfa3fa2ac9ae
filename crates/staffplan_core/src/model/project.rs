//! Project domain model.
//!
//! Projects are inputs to the allocation engine: they must exist for an
//! assignment to be proposed, and deleting one releases all of its
//! assignments. Projects never own assignments; they only count them.

use super::validation::{ensure_date_range, ensure_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;

/// Project lifecycle state, set by a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }

    /// Accepts `on_hold`, `on-hold` and `on hold`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "planning" => Some(Self::Planning),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }

    /// Display tone used by project cards.
    pub fn color(self) -> &'static str {
        match self {
            Self::Active => "success",
            Self::Completed => "primary",
            Self::Planning => "warning",
            Self::OnHold => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl ProjectPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::High => "error",
            Self::Medium => "warning",
            Self::Low => "success",
        }
    }
}

/// Project metadata needed by allocation and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub team_size: u32,
    /// Unix epoch milliseconds.
    pub start_date: i64,
    /// Unix epoch milliseconds, `>= start_date`.
    pub end_date: i64,
}

impl Project {
    /// Creates a planning-stage, medium-priority project with a team size of one.
    pub fn new(name: impl Into<String>, start_date: i64, end_date: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            required_skills: Vec::new(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::default(),
            team_size: 1,
            start_date,
            end_date,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank(&self.name, ValidationError::BlankName)?;
        if self.team_size == 0 {
            return Err(ValidationError::ZeroTeamSize);
        }
        ensure_date_range(self.start_date, self.end_date)
    }
}
