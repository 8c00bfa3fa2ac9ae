//! Engineer domain model.
//!
//! # Responsibility
//! - Define the capacity-bearing record that assignments are charged against.
//! - Normalize free-form skill input into a stable, comparable set.
//!
//! # Invariants
//! - `max_capacity` is within `[1, 100]`; zero is rejected here so utilization
//!   never divides by zero at read time.
//! - `skills` is lowercase, trimmed, deduplicated and sorted.

use super::validation::{ensure_not_blank, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Default capacity for a full-time engineer, in percent.
pub const DEFAULT_MAX_CAPACITY: u32 = 100;

/// Upper bound of `max_capacity`, in percent.
pub const CAPACITY_CEILING: u32 = 100;

static SKILL_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[,;\n]\s*").expect("valid skill separator regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

pub type EngineerId = Uuid;

/// Seniority tier shown next to the engineer on capacity dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
}

impl Seniority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "junior" => Some(Self::Junior),
            "mid" => Some(Self::Mid),
            "senior" => Some(Self::Senior),
            _ => None,
        }
    }
}

/// An engineer whose capacity is allocated to projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engineer {
    pub id: EngineerId,
    pub name: String,
    pub skills: Vec<String>,
    pub seniority: Seniority,
    pub department: String,
    /// Total capacity in percent, typically 100.
    pub max_capacity: u32,
}

impl Engineer {
    /// Creates a full-time engineer with a generated ID and no skills.
    pub fn new(
        name: impl Into<String>,
        seniority: Seniority,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            skills: Vec::new(),
            seniority,
            department: department.into(),
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }

    /// Checks record-level invariants.
    ///
    /// # Errors
    /// - `BlankName` when the name is empty after trim.
    /// - `MaxCapacityOutOfRange` when capacity is `0` or above `100`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank(&self.name, ValidationError::BlankName)?;
        validate_max_capacity(self.max_capacity)
    }
}

pub fn validate_max_capacity(value: u32) -> Result<(), ValidationError> {
    if value == 0 || value > CAPACITY_CEILING {
        return Err(ValidationError::MaxCapacityOutOfRange(value));
    }
    Ok(())
}

/// Splits comma/semicolon/newline separated skill input into normalized skills.
///
/// `"Rust,  react ;rust"` -> `["react", "rust"]`.
pub fn parse_skill_list(input: &str) -> Vec<String> {
    let parts: Vec<String> = SKILL_SEPARATOR_RE
        .split(input)
        .map(str::to_string)
        .collect();
    normalize_skills(&parts)
}

/// Normalizes one skill name; returns `None` for blank input.
pub fn normalize_skill(skill: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(skill.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.to_lowercase())
}

/// Normalizes, deduplicates and sorts skills.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    skills
        .iter()
        .filter_map(|skill| normalize_skill(skill))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
