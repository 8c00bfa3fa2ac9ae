//! Durable assignment log keyed by engineer.
//!
//! # Responsibility
//! - Persist one row per assignment; remove the row on unassign.
//! - Provide the rows the ledger sums to rebuild per-engineer totals.
//!
//! # Invariants
//! - Only the allocation ledger writes through this repository.
//! - No aggregate totals are stored; they are always recomputed.
//! - `(project, engineer)` is unique among stored rows.
//! - An insert rejected by a foreign key reports the missing reference as
//!   `NotFound`, so a project deleted mid-commit surfaces as "not found".

use super::{parse_u32, parse_uuid, RepoError, RepoResult};
use crate::db::SharedConnection;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::engineer::EngineerId;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    engineer_uuid,
    allocation_percentage,
    start_date,
    end_date,
    role
FROM assignments";

pub trait AssignmentRepository: Send + Sync {
    fn insert_assignment(&self, assignment: &Assignment) -> RepoResult<()>;
    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>>;
    /// Lists every stored assignment ordered by engineer, then start date.
    fn list_assignments(&self) -> RepoResult<Vec<Assignment>>;
    fn list_for_engineer(&self, engineer_id: EngineerId) -> RepoResult<Vec<Assignment>>;
    /// Sums stored allocation for one engineer; used to audit ledger state.
    fn sum_for_engineer(&self, engineer_id: EngineerId) -> RepoResult<u32>;
}

#[derive(Clone)]
pub struct SqliteAssignmentRepository {
    conn: SharedConnection,
}

impl SqliteAssignmentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn query(&self, filter: &str, bind: Option<String>) -> RepoResult<Vec<Assignment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} {filter} ORDER BY engineer_uuid ASC, start_date ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind.iter()))?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }
}

impl AssignmentRepository for SqliteAssignmentRepository {
    fn insert_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        assignment.validate()?;
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO assignments (
                uuid,
                project_uuid,
                engineer_uuid,
                allocation_percentage,
                start_date,
                end_date,
                role
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                assignment.id.to_string(),
                assignment.project_id.to_string(),
                assignment.engineer_id.to_string(),
                assignment.allocation_percentage,
                assignment.start_date,
                assignment.end_date,
                assignment.role.trim(),
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                Err(missing_reference(&conn, assignment)?.unwrap_or_else(|| err.into()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_assignment(&self, id: AssignmentId) -> RepoResult<()> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM assignments WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "assignment",
                id,
            });
        }
        Ok(())
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        Ok(self
            .query("WHERE uuid = ?1", Some(id.to_string()))?
            .into_iter()
            .next())
    }

    fn list_assignments(&self) -> RepoResult<Vec<Assignment>> {
        self.query("", None)
    }

    fn list_for_engineer(&self, engineer_id: EngineerId) -> RepoResult<Vec<Assignment>> {
        self.query("WHERE engineer_uuid = ?1", Some(engineer_id.to_string()))
    }

    fn sum_for_engineer(&self, engineer_id: EngineerId) -> RepoResult<u32> {
        let total: i64 = self.conn.lock().query_row(
            "SELECT COALESCE(SUM(allocation_percentage), 0)
             FROM assignments
             WHERE engineer_uuid = ?1;",
            [engineer_id.to_string()],
            |row| row.get(0),
        )?;
        parse_u32(total, "SUM(assignments.allocation_percentage)")
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

/// Names the referenced row that no longer exists, if any.
fn missing_reference(
    conn: &Connection,
    assignment: &Assignment,
) -> RepoResult<Option<RepoError>> {
    let exists = |table: &str, id: &str| -> RepoResult<bool> {
        Ok(conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE uuid = ?1);"),
            [id],
            |row| row.get(0),
        )?)
    };
    if !exists("projects", &assignment.project_id.to_string())? {
        return Ok(Some(RepoError::NotFound {
            entity: "project",
            id: assignment.project_id,
        }));
    }
    if !exists("engineers", &assignment.engineer_id.to_string())? {
        return Ok(Some(RepoError::NotFound {
            entity: "engineer",
            id: assignment.engineer_id,
        }));
    }
    Ok(None)
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let id_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let engineer_text: String = row.get("engineer_uuid")?;

    let assignment = Assignment {
        id: parse_uuid(&id_text, "assignments.uuid")?,
        project_id: parse_uuid(&project_text, "assignments.project_uuid")?,
        engineer_id: parse_uuid(&engineer_text, "assignments.engineer_uuid")?,
        allocation_percentage: parse_u32(
            row.get("allocation_percentage")?,
            "assignments.allocation_percentage",
        )?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        role: row.get("role")?,
    };
    assignment.validate()?;
    Ok(assignment)
}
