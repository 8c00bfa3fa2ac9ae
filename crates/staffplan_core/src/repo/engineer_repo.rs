//! Engineer repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `Engineer::validate()` runs before every insert/update, so a zero
//!   `max_capacity` can never be persisted.
//! - Skills are written as a full replacement inside the record transaction.

use super::{load_skills, parse_u32, parse_uuid, replace_skills, RepoError, RepoResult};
use crate::db::SharedConnection;
use crate::model::engineer::{normalize_skills, Engineer, EngineerId, Seniority};
use rusqlite::{params, Connection, Row};

const ENGINEER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    seniority,
    department,
    max_capacity
FROM engineers";

/// Repository interface for the engineer roster.
pub trait EngineerRepository: Send + Sync {
    fn create_engineer(&self, engineer: &Engineer) -> RepoResult<EngineerId>;
    fn update_engineer(&self, engineer: &Engineer) -> RepoResult<()>;
    fn get_engineer(&self, id: EngineerId) -> RepoResult<Option<Engineer>>;
    /// Lists engineers ordered by name (case-insensitive), then ID.
    fn list_engineers(&self) -> RepoResult<Vec<Engineer>>;
}

/// SQLite-backed engineer repository.
#[derive(Clone)]
pub struct SqliteEngineerRepository {
    conn: SharedConnection,
}

impl SqliteEngineerRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl EngineerRepository for SqliteEngineerRepository {
    fn create_engineer(&self, engineer: &Engineer) -> RepoResult<EngineerId> {
        engineer.validate()?;
        let id_text = engineer.id.to_string();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO engineers (uuid, name, seniority, department, max_capacity)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id_text,
                engineer.name.trim(),
                engineer.seniority.as_str(),
                engineer.department.trim(),
                engineer.max_capacity,
            ],
        )?;
        replace_skills(
            &tx,
            "engineer_skills",
            "engineer_uuid",
            &id_text,
            &normalize_skills(&engineer.skills),
        )?;
        tx.commit()?;

        Ok(engineer.id)
    }

    fn update_engineer(&self, engineer: &Engineer) -> RepoResult<()> {
        engineer.validate()?;
        let id_text = engineer.id.to_string();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE engineers
             SET
                name = ?1,
                seniority = ?2,
                department = ?3,
                max_capacity = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                engineer.name.trim(),
                engineer.seniority.as_str(),
                engineer.department.trim(),
                engineer.max_capacity,
                id_text,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "engineer",
                id: engineer.id,
            });
        }
        replace_skills(
            &tx,
            "engineer_skills",
            "engineer_uuid",
            &id_text,
            &normalize_skills(&engineer.skills),
        )?;
        tx.commit()?;

        Ok(())
    }

    fn get_engineer(&self, id: EngineerId) -> RepoResult<Option<Engineer>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{ENGINEER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_engineer_row(&conn, row)?));
        }
        Ok(None)
    }

    fn list_engineers(&self) -> RepoResult<Vec<Engineer>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{ENGINEER_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut engineers = Vec::new();
        while let Some(row) = rows.next()? {
            engineers.push(parse_engineer_row(&conn, row)?);
        }
        Ok(engineers)
    }
}

fn parse_engineer_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Engineer> {
    let id_text: String = row.get("uuid")?;
    let id = parse_uuid(&id_text, "engineers.uuid")?;

    let seniority_text: String = row.get("seniority")?;
    let seniority = Seniority::parse(&seniority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid seniority `{seniority_text}` in engineers.seniority"
        ))
    })?;

    let engineer = Engineer {
        id,
        name: row.get("name")?,
        skills: load_skills(conn, "engineer_skills", "engineer_uuid", &id_text)?,
        seniority,
        department: row.get("department")?,
        max_capacity: parse_u32(row.get("max_capacity")?, "engineers.max_capacity")?,
    };
    engineer.validate()?;
    Ok(engineer)
}
