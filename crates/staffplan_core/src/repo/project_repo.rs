//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `Project::validate()` runs before every insert/update.
//! - Deleting a project cascades to its assignment rows at the SQL level;
//!   the ledger releases them first so in-memory totals never lag storage.

use super::{load_skills, parse_u32, parse_uuid, replace_skills, RepoError, RepoResult};
use crate::db::SharedConnection;
use crate::model::engineer::normalize_skills;
use crate::model::project::{Project, ProjectId, ProjectPriority, ProjectStatus};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    status,
    priority,
    team_size,
    start_date,
    end_date
FROM projects";

pub trait ProjectRepository: Send + Sync {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists projects ordered by start date, then name.
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    /// Hard-deletes one project row.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

#[derive(Clone)]
pub struct SqliteProjectRepository {
    conn: SharedConnection,
}

impl SqliteProjectRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;
        let id_text = project.id.to_string();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO projects (
                uuid,
                name,
                description,
                status,
                priority,
                team_size,
                start_date,
                end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id_text,
                project.name.trim(),
                project.description.as_deref(),
                project.status.as_str(),
                project.priority.as_str(),
                project.team_size,
                project.start_date,
                project.end_date,
            ],
        )?;
        replace_skills(
            &tx,
            "project_skills",
            "project_uuid",
            &id_text,
            &normalize_skills(&project.required_skills),
        )?;
        tx.commit()?;

        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;
        let id_text = project.id.to_string();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE projects
             SET
                name = ?1,
                description = ?2,
                status = ?3,
                priority = ?4,
                team_size = ?5,
                start_date = ?6,
                end_date = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?8;",
            params![
                project.name.trim(),
                project.description.as_deref(),
                project.status.as_str(),
                project.priority.as_str(),
                project.team_size,
                project.start_date,
                project.end_date,
                id_text,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        replace_skills(
            &tx,
            "project_skills",
            "project_uuid",
            &id_text,
            &normalize_skills(&project.required_skills),
        )?;
        tx.commit()?;

        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(&conn, row)?));
        }
        Ok(None)
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} ORDER BY start_date ASC, name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(&conn, row)?);
        }
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id,
            });
        }
        Ok(())
    }
}

fn parse_project_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("uuid")?;
    let id = parse_uuid(&id_text, "projects.uuid")?;

    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in projects.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = ProjectPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in projects.priority"
        ))
    })?;

    let project = Project {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        required_skills: load_skills(conn, "project_skills", "project_uuid", &id_text)?,
        status,
        priority,
        team_size: parse_u32(row.get("team_size")?, "projects.team_size")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
    };
    project.validate()?;
    Ok(project)
}
