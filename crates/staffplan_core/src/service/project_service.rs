//! Project lifecycle service.
//!
//! # Responsibility
//! - Create, read, list and re-status projects.
//! - Delete projects, then release their assignments through the ledger.
//! - Provide manager-dashboard filtering and summary counts.
//!
//! # Invariants
//! - A deleted project leaves no assignment in memory or storage, even when
//!   a commit for it races the delete.
//! - Filters are read-only and never touch the ledger.

use crate::ledger::{AllocationLedger, LedgerError};
use crate::model::engineer::normalize_skills;
use crate::model::project::{Project, ProjectId, ProjectPriority, ProjectStatus};
use crate::model::validation::ValidationError;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub team_size: Option<u32>,
    pub start_date: i64,
    pub end_date: i64,
}

/// Manager dashboard filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
}

impl ProjectFilter {
    /// Search is case-insensitive over name, description, skills and priority.
    pub fn matches(&self, project: &Project) -> bool {
        if self.status.is_some_and(|status| status != project.status) {
            return false;
        }
        if self
            .priority
            .is_some_and(|priority| priority != project.priority)
        {
            return false;
        }

        let Some(term) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();

        project.name.to_lowercase().contains(&term)
            || project
                .description
                .as_deref()
                .is_some_and(|description| description.to_lowercase().contains(&term))
            || project
                .required_skills
                .iter()
                .any(|skill| skill.to_lowercase().contains(&term))
            || project.priority.as_str().contains(&term)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub planning: usize,
    pub on_hold: usize,
}

impl ProjectSummary {
    pub fn from_projects(projects: &[Project]) -> Self {
        projects
            .iter()
            .fold(Self::default(), |mut summary, project| {
                summary.total += 1;
                match project.status {
                    ProjectStatus::Active => summary.active += 1,
                    ProjectStatus::Completed => summary.completed += 1,
                    ProjectStatus::Planning => summary.planning += 1,
                    ProjectStatus::OnHold => summary.on_hold += 1,
                }
                summary
            })
    }
}

#[derive(Debug)]
pub enum ProjectServiceError {
    Validation(ValidationError),
    ProjectNotFound(ProjectId),
    Ledger(LedgerError),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ProjectNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for ProjectServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<LedgerError> for ProjectServiceError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

pub struct ProjectService<P: ProjectRepository, A: AssignmentRepository> {
    projects: P,
    ledger: Arc<AllocationLedger<A>>,
}

impl<P: ProjectRepository, A: AssignmentRepository> ProjectService<P, A> {
    pub fn new(projects: P, ledger: Arc<AllocationLedger<A>>) -> Self {
        Self { projects, ledger }
    }

    pub fn create_project(&self, input: &NewProject) -> Result<Project, ProjectServiceError> {
        let project = Project {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            required_skills: normalize_skills(&input.required_skills),
            status: input.status.unwrap_or(ProjectStatus::Planning),
            priority: input.priority.unwrap_or_default(),
            team_size: input.team_size.unwrap_or(1),
            start_date: input.start_date,
            end_date: input.end_date,
        };
        project.validate()?;
        self.projects.create_project(&project)?;

        info!(
            "event=project_create module=service status=ok project_id={} status={}",
            project.id,
            project.status.as_str()
        );
        Ok(project)
    }

    pub fn get_project(&self, project_id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.projects
            .get_project(project_id)?
            .ok_or(ProjectServiceError::ProjectNotFound(project_id))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ProjectServiceError> {
        Ok(self.projects.list_projects()?)
    }

    pub fn update_status(
        &self,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<Project, ProjectServiceError> {
        let mut project = self.get_project(project_id)?;
        project.status = status;
        self.projects.update_project(&project)?;
        Ok(project)
    }

    /// Hard-deletes a project; returns how many assignments were released.
    ///
    /// The row goes first so the foreign key rejects any commit still in
    /// flight; the ledger then frees the capacity of rows the cascade dropped.
    pub fn delete_project(&self, project_id: ProjectId) -> Result<usize, ProjectServiceError> {
        self.projects.delete_project(project_id)?;
        let released = self.ledger.release_project(project_id)?;

        info!(
            "event=project_delete module=service status=ok project_id={} released={}",
            project_id,
            released.len()
        );
        Ok(released.len())
    }

    pub fn filter_projects(
        &self,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        Ok(self
            .list_projects()?
            .into_iter()
            .filter(|project| filter.matches(project))
            .collect())
    }

    pub fn summary(&self) -> Result<ProjectSummary, ProjectServiceError> {
        Ok(ProjectSummary::from_projects(&self.list_projects()?))
    }

    /// Number of assignments currently referencing the project.
    pub fn staffing_count(&self, project_id: ProjectId) -> usize {
        self.ledger.assignments_for_project(project_id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectFilter, ProjectSummary};
    use crate::model::project::{Project, ProjectPriority, ProjectStatus};

    fn project(name: &str, status: ProjectStatus, priority: ProjectPriority) -> Project {
        let mut project = Project::new(name, 0, 10);
        project.status = status;
        project.priority = priority;
        project
    }

    #[test]
    fn filter_search_matches_skills_and_priority() {
        let mut atlas = project("Atlas", ProjectStatus::Active, ProjectPriority::High);
        atlas.required_skills = vec!["rust".to_string()];
        atlas.description = Some("Billing pipeline".to_string());

        let by_skill = ProjectFilter {
            search: Some("RUS".to_string()),
            ..ProjectFilter::default()
        };
        assert!(by_skill.matches(&atlas));

        let by_priority = ProjectFilter {
            search: Some("high".to_string()),
            ..ProjectFilter::default()
        };
        assert!(by_priority.matches(&atlas));

        let by_description = ProjectFilter {
            search: Some("billing".to_string()),
            ..ProjectFilter::default()
        };
        assert!(by_description.matches(&atlas));

        let miss = ProjectFilter {
            search: Some("frontend".to_string()),
            ..ProjectFilter::default()
        };
        assert!(!miss.matches(&atlas));
    }

    #[test]
    fn filter_status_and_priority_narrow_search() {
        let atlas = project("Atlas", ProjectStatus::Active, ProjectPriority::Low);
        let filter = ProjectFilter {
            search: Some("  ".to_string()),
            status: Some(ProjectStatus::Active),
            priority: Some(ProjectPriority::High),
        };
        assert!(!filter.matches(&atlas));

        let filter = ProjectFilter {
            priority: Some(ProjectPriority::Low),
            ..filter
        };
        assert!(filter.matches(&atlas));
    }

    #[test]
    fn summary_counts_every_status() {
        let projects = vec![
            project("a", ProjectStatus::Active, ProjectPriority::Low),
            project("b", ProjectStatus::Active, ProjectPriority::Low),
            project("c", ProjectStatus::Completed, ProjectPriority::Low),
            project("d", ProjectStatus::OnHold, ProjectPriority::Low),
        ];
        assert_eq!(
            ProjectSummary::from_projects(&projects),
            ProjectSummary {
                total: 4,
                active: 2,
                completed: 1,
                planning: 0,
                on_hold: 1,
            }
        );
    }
}
