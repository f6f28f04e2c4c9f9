//! Document store repositories.
//!
//! # Responsibility
//! - Define use-case oriented persistence contracts for campaigns and
//!   top-level objects.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories only accept connections migrated to the latest version.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::campaign::CampaignValidationError;
use crate::model::object::ObjectValidationError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod campaign_repo;
pub mod object_repo;
mod relationships;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for campaign and object persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Campaign record rejected before write.
    CampaignValidation(CampaignValidationError),
    /// Top-level object rejected before write.
    ObjectValidation(ObjectValidationError),
    Db(DbError),
    /// No row with this id (and type, for objects).
    NotFound(Uuid),
    /// Campaign name already taken.
    DuplicateName(String),
    /// Persisted row cannot be converted into a valid model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl RepoError {
    /// Whether this error is a schema/field rejection rather than a storage
    /// failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::CampaignValidation(_) | Self::ObjectValidation(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CampaignValidation(err) => write!(f, "{err}"),
            Self::ObjectValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::DuplicateName(name) => write!(f, "campaign name already exists: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CampaignValidation(err) => Some(err),
            Self::ObjectValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CampaignValidationError> for RepoError {
    fn from(value: CampaignValidationError) -> Self {
        Self::CampaignValidation(value)
    }
}

impl From<ObjectValidationError> for RepoError {
    fn from(value: ObjectValidationError) -> Self {
        Self::ObjectValidation(value)
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

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
