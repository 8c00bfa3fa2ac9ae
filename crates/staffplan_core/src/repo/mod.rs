//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for engineers, projects
//!   and the assignment log.
//! - Isolate SQLite query details from the ledger and services.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Read paths re-validate rows and reject invalid persisted state.
//! - Repository APIs return semantic `NotFound` in addition to DB errors.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod assignment_repo;
pub mod engineer_repo;
pub mod project_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_u32(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid unsigned value `{value}` in {column}"))
    })
}

/// Replaces the skill rows of one owner inside the caller's transaction.
pub(crate) fn replace_skills(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_uuid: &str,
    skills: &[String],
) -> RepoResult<()> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_column} = ?1;"),
        [owner_uuid],
    )?;
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table} ({owner_column}, skill) VALUES (?1, ?2);"
    ))?;
    for skill in skills {
        stmt.execute(params![owner_uuid, skill])?;
    }
    Ok(())
}

pub(crate) fn load_skills(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_uuid: &str,
) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT skill FROM {table} WHERE {owner_column} = ?1 ORDER BY skill ASC;"
    ))?;
    let mut rows = stmt.query([owner_uuid])?;
    let mut skills = Vec::new();
    while let Some(row) = rows.next()? {
        skills.push(row.get(0)?);
    }
    Ok(skills)
}
