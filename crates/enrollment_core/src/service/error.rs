//! Service-layer error shared by every use case.

use crate::repo::RepoError;
use crate::service::conflict::Conflict;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Malformed input or a reference to an unknown entity.
    Validation(String),
    NotFound { entity: &'static str, id: Uuid },
    /// Caller does not own the resource or has the wrong role.
    Forbidden(String),
    /// Caller identity cannot be resolved.
    Unauthorized(String),
    Conflict(Conflict),
    /// The class lock was not acquired within the configured wait.
    LockTimeout,
    Repo(RepoError),
}

impl ServiceError {
    /// Only lock timeouts are safe to retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout)
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Self::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    /// Short status label used in log lines.
    pub(crate) fn log_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(conflict) => conflict.code(),
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::Repo(_) => "REPO",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::Conflict(conflict) => write!(f, "{conflict}"),
            Self::LockTimeout => write!(f, "timed out waiting for class lock"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        if value.is_lock_contention() {
            return Self::LockTimeout;
        }
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::InvalidClass(err) => Self::Validation(err.to_string()),
            RepoError::InvalidTimeSlot(err) => Self::Validation(err.to_string()),
            RepoError::InvalidUser(err) => Self::Validation(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        RepoError::from(value).into()
    }
}

impl From<Conflict> for ServiceError {
    fn from(value: Conflict) -> Self {
        Self::Conflict(value)
    }
}
