//! Resolves callers to role-checked identities.

use crate::model::reference::Course;
use crate::model::user::{Coordinator, Student, User, UserRole};
use crate::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use crate::service::error::{ServiceError, ServiceResult};
use rusqlite::Connection;

pub struct IdentityService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> IdentityService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Unknown email is `Unauthorized`; a non-student is `Forbidden`.
    pub fn current_student(&self, email: &str) -> ServiceResult<Student> {
        let user = self.resolve(email)?;
        user.as_student()
            .ok_or_else(|| role_mismatch(&user, UserRole::Student))
    }

    /// Unknown email is `Unauthorized`; a non-coordinator is `Forbidden`.
    pub fn current_coordinator(&self, email: &str) -> ServiceResult<Coordinator> {
        let user = self.resolve(email)?;
        user.as_coordinator()
            .ok_or_else(|| role_mismatch(&user, UserRole::Coordinator))
    }

    /// The student's declared course, if any.
    pub fn student_course(&self, student: &Student) -> ServiceResult<Option<Course>> {
        let Some(course_id) = student.course_id else {
            return Ok(None);
        };
        Ok(SqliteReferenceRepository::new(self.conn).get_course(course_id)?)
    }

    fn resolve(&self, email: &str) -> ServiceResult<User> {
        SqliteReferenceRepository::new(self.conn)
            .find_user_by_email(email)?
            .ok_or_else(|| ServiceError::Unauthorized(format!("unknown user `{}`", email.trim())))
    }
}

fn role_mismatch(user: &User, required: UserRole) -> ServiceError {
    log::warn!(
        "event=identity_resolve module=identity status=rejected required_role={} actual_role={}",
        required.as_str(),
        user.role.as_str()
    );
    ServiceError::Forbidden(format!("{} role required", required.as_str()))
}
