//! Student enrollment: candidate listing and the admission-control engine.
//!
//! # Responsibility
//! - List classes a student could enroll in right now.
//! - Admit or reject one enrollment attempt atomically.
//!
//! # Invariants
//! - `enroll` takes the class lock before reading any state it decides on,
//!   then re-runs the full eligibility chain. With K free seats and N
//!   concurrent attempts exactly `min(N, K)` succeed; the rest see `NO_SEATS`.
//! - A rejected attempt writes nothing.
//! - A lock wait beyond the connection busy timeout is `LockTimeout`, never a
//!   conflict.

use crate::model::enrollment::Enrollment;
use crate::model::matrix::{MatrixClass, MatrixClassId, MatrixId};
use crate::model::reference::SubjectId;
use crate::model::user::Student;
use crate::repo::enrollment_repo::{EnrollmentRepository, SqliteEnrollmentRepository};
use crate::repo::matrix_repo::{MatrixRepository, SqliteMatrixRepository};
use crate::repo::RepoResult;
use crate::service::eligibility::{gate, is_listable, EligibilityContext};
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::time::Instant;

/// A class the student may enroll in, with its remaining capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableClass {
    pub class: MatrixClass,
    pub available_seats: u32,
}

/// An enrollment together with the class it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolledClass {
    pub enrollment: Enrollment,
    pub class: MatrixClass,
}

pub struct EnrollmentService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> EnrollmentService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Classes of the active matrix that pass every eligibility check.
    ///
    /// Empty when no matrix is active or when `matrix_filter` names a
    /// matrix other than the active one.
    pub fn list_available(
        &self,
        student: &Student,
        matrix_filter: Option<MatrixId>,
        subject_filter: Option<SubjectId>,
    ) -> ServiceResult<Vec<AvailableClass>> {
        let matrices = SqliteMatrixRepository::new(self.conn);
        let enrollments = SqliteEnrollmentRepository::new(self.conn);

        let Some(active) = matrices.find_active_matrix()? else {
            return Ok(Vec::new());
        };
        if matrix_filter.is_some_and(|matrix_id| matrix_id != active.id) {
            return Ok(Vec::new());
        }

        let student_classes = matrices.list_classes_enrolled_by(student.id)?;
        let mut available = Vec::new();
        for class in matrices.list_classes_by_matrix(active.id)? {
            if subject_filter.is_some_and(|subject_id| subject_id != class.subject_id) {
                continue;
            }
            let context = EligibilityContext {
                active_matrix_id: Some(active.id),
                enrolled_count: enrollments.count_enrollments(class.id)?,
                already_enrolled: enrollments.exists_enrollment(class.id, student.id)?,
                student_classes: student_classes.clone(),
            };
            if is_listable(student, &class, &context) {
                available.push(AvailableClass {
                    available_seats: class.max_students.saturating_sub(context.enrolled_count),
                    class,
                });
            }
        }

        debug!(
            "event=list_available module=enrollment status=ok count={}",
            available.len()
        );
        Ok(available)
    }

    /// Admits the student into the class or returns the first failing check.
    pub fn enroll(&self, class_id: MatrixClassId, student: &Student) -> ServiceResult<Enrollment> {
        let started_at = Instant::now();
        let result = self.enroll_locked(class_id, student);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(enrollment) => info!(
                "event=enroll module=enrollment status=ok class_id={class_id} enrollment_id={} duration_ms={duration_ms}",
                enrollment.id
            ),
            Err(err) => warn!(
                "event=enroll module=enrollment status=rejected class_id={class_id} code={} retryable={} duration_ms={duration_ms}",
                err.log_code(),
                err.is_retryable()
            ),
        }
        result
    }

    /// Enrollments in visible classes, oldest first.
    pub fn list_enrolled(&self, student: &Student) -> ServiceResult<Vec<EnrolledClass>> {
        let matrices = SqliteMatrixRepository::new(self.conn);
        let enrollments = SqliteEnrollmentRepository::new(self.conn);

        let mut classes: HashMap<MatrixClassId, MatrixClass> = matrices
            .list_classes_enrolled_by(student.id)?
            .into_iter()
            .map(|class| (class.id, class))
            .collect();

        Ok(enrollments
            .find_enrollments_by_student(student.id)?
            .into_iter()
            .filter_map(|enrollment| {
                classes
                    .remove(&enrollment.class_id)
                    .map(|class| EnrolledClass { enrollment, class })
            })
            .collect())
    }

    fn enroll_locked(
        &self,
        class_id: MatrixClassId,
        student: &Student,
    ) -> ServiceResult<Enrollment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let matrices = SqliteMatrixRepository::new(&tx);
        let enrollments = SqliteEnrollmentRepository::new(&tx);

        let class = matrices
            .lock_class_for_update(class_id)?
            .ok_or(ServiceError::NotFound {
                entity: "class",
                id: class_id,
            })?;

        let context = load_context(&matrices, &enrollments, &class, student)?;
        gate(student, &class, &context)?;

        let enrollment = enrollments.create_enrollment(class_id, student.id)?;
        tx.commit()?;
        Ok(enrollment)
    }
}

fn load_context<M, E>(
    matrices: &M,
    enrollments: &E,
    class: &MatrixClass,
    student: &Student,
) -> RepoResult<EligibilityContext>
where
    M: MatrixRepository,
    E: EnrollmentRepository,
{
    Ok(EligibilityContext {
        active_matrix_id: matrices.find_active_matrix()?.map(|matrix| matrix.id),
        enrolled_count: enrollments.count_enrollments(class.id)?,
        already_enrolled: enrollments.exists_enrollment(class.id, student.id)?,
        student_classes: matrices.list_classes_enrolled_by(student.id)?,
    })
}
