//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define the lookup/query contracts the enrollment core consumes.
//! - Isolate SQLite query details from service orchestration.
//! - Apply the "visible rows only" soft-delete predicate in one place.
//!
//! # Invariants
//! - Repository writes validate model shape before SQL mutations.
//! - Repositories never open transactions; callers pass a connection or an
//!   open `Transaction` (which derefs to `Connection`).

use crate::db::DbError;
use crate::model::matrix::MatrixClassValidationError;
use crate::model::time_slot::TimeSlotValidationError;
use crate::model::user::UserValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod enrollment_repo;
pub mod matrix_repo;
pub mod reference_repo;

/// Soft-delete filter for `curriculum_matrices` rows aliased as `m`.
pub(crate) const VISIBLE_MATRIX: &str = "m.deleted_at IS NULL";
/// Soft-delete filter for `matrix_classes` rows aliased as `c`.
pub(crate) const VISIBLE_CLASS: &str = "c.deleted_at IS NULL";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row does not exist or is soft-deleted.
    NotFound { entity: &'static str, id: Uuid },
    InvalidClass(MatrixClassValidationError),
    InvalidTimeSlot(TimeSlotValidationError),
    InvalidUser(UserValidationError),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl RepoError {
    /// Whether the failure is a lock-wait timeout rather than a hard error.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Self::Db(err) => err.is_lock_contention(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidClass(err) => write!(f, "{err}"),
            Self::InvalidTimeSlot(err) => write!(f, "{err}"),
            Self::InvalidUser(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidClass(err) => Some(err),
            Self::InvalidTimeSlot(err) => Some(err),
            Self::InvalidUser(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
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

impl From<MatrixClassValidationError> for RepoError {
    fn from(value: MatrixClassValidationError) -> Self {
        Self::InvalidClass(value)
    }
}

impl From<TimeSlotValidationError> for RepoError {
    fn from(value: TimeSlotValidationError) -> Self {
        Self::InvalidTimeSlot(value)
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::InvalidUser(value)
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_count(value: i64, column: &'static str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid count `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}
