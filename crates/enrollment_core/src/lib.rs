//! Core domain logic for class enrollment.
//! This crate is the single source of truth for admission-control invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::enrollment::{Enrollment, EnrollmentId};
pub use model::matrix::{CurriculumMatrix, MatrixClass, MatrixClassId, MatrixId, MatrixSummary};
pub use model::reference::{Course, CourseId, Professor, ProfessorId, Subject, SubjectId};
pub use model::time_slot::{overlaps, PeriodOfDay, TimeOfDay, TimeSlot, TimeSlotId, Weekday};
pub use model::user::{Coordinator, Student, User, UserId, UserRole};
pub use repo::{RepoError, RepoResult};
pub use service::conflict::{Conflict, ConflictKind};
pub use service::enrollment_service::{AvailableClass, EnrolledClass, EnrollmentService};
pub use service::error::{ServiceError, ServiceResult};
pub use service::identity_service::IdentityService;
pub use service::matrix_class_service::{
    CreateClassRequest, MatrixClassFilter, MatrixClassService, UpdateClassRequest,
};
pub use service::matrix_service::MatrixService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
