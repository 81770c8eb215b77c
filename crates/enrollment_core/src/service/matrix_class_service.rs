//! Coordinator use cases for classes inside a matrix.
//!
//! # Responsibility
//! - Create, read, filter, update and soft-delete classes of an owned matrix.
//! - Run the structural guards in the same IMMEDIATE transaction as the
//!   write they protect.
//!
//! # Invariants
//! - A class addressed through a different matrix is `Forbidden`, not
//!   `NotFound`.
//! - Updates are all-or-nothing: a guard rejection leaves the class intact.
//! - The schedule-safety guard only runs when the time slot changes.

use crate::model::matrix::{validate_class_shape, MatrixClass, MatrixClassId, MatrixId};
use crate::model::reference::{CourseId, ProfessorId, SubjectId};
use crate::model::time_slot::{PeriodOfDay, TimeSlot, TimeSlotId};
use crate::model::user::Coordinator;
use crate::repo::enrollment_repo::{EnrollmentRepository, SqliteEnrollmentRepository};
use crate::repo::matrix_repo::{MatrixRepository, SqliteMatrixRepository};
use crate::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use crate::repo::RepoError;
use crate::service::class_guard::{
    guard_authorization_narrowing, guard_deletion, guard_schedule_change, RosterEntry,
};
use crate::service::conflict::Conflict;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::matrix_service::load_owned_matrix;
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateClassRequest {
    pub subject_id: SubjectId,
    pub professor_id: ProfessorId,
    pub time_slot_id: TimeSlotId,
    pub max_students: u32,
    pub authorized_course_ids: BTreeSet<CourseId>,
}

/// Full replacement of the editable class fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClassRequest {
    pub professor_id: ProfessorId,
    pub time_slot_id: TimeSlotId,
    pub authorized_course_ids: BTreeSet<CourseId>,
}

/// Optional listing filters; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixClassFilter {
    /// Matches on the slot's start time.
    pub period_of_day: Option<PeriodOfDay>,
    pub authorized_course_id: Option<CourseId>,
    pub max_students_min: Option<u32>,
    pub max_students_max: Option<u32>,
}

impl MatrixClassFilter {
    pub fn matches(&self, class: &MatrixClass) -> bool {
        if let Some(period) = self.period_of_day {
            if !period.contains(class.time_slot.start) {
                return false;
            }
        }
        if let Some(course_id) = self.authorized_course_id {
            if !class.authorizes(course_id) {
                return false;
            }
        }
        if self
            .max_students_min
            .is_some_and(|min| class.max_students < min)
        {
            return false;
        }
        if self
            .max_students_max
            .is_some_and(|max| class.max_students > max)
        {
            return false;
        }
        true
    }
}

pub struct MatrixClassService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MatrixClassService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create_class(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        request: CreateClassRequest,
    ) -> ServiceResult<MatrixClass> {
        validate_class_shape(request.max_students, &request.authorized_course_ids)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let matrices = SqliteMatrixRepository::new(&tx);
        let reference = SqliteReferenceRepository::new(&tx);

        load_owned_matrix(&matrices, matrix_id, coordinator)?;
        if reference.get_subject(request.subject_id)?.is_none() {
            return Err(unknown_reference("subject", request.subject_id));
        }
        if reference.get_professor(request.professor_id)?.is_none() {
            return Err(unknown_reference("professor", request.professor_id));
        }
        let time_slot = resolve_time_slot(&reference, request.time_slot_id)?;

        if matrices.subject_slot_taken(matrix_id, request.subject_id, time_slot.id, None)? {
            return Err(Conflict::DuplicateSubjectSlot {
                matrix_id,
                subject_id: request.subject_id,
                time_slot_id: time_slot.id,
            }
            .into());
        }
        ensure_courses_exist(&reference, &request.authorized_course_ids)?;

        let class_id = matrices.create_class(&MatrixClass {
            id: Uuid::new_v4(),
            matrix_id,
            subject_id: request.subject_id,
            professor_id: request.professor_id,
            time_slot,
            max_students: request.max_students,
            authorized_course_ids: request.authorized_course_ids,
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
        })?;
        let created = load_class_in_matrix(&matrices, class_id, matrix_id)?;
        tx.commit()?;

        info!("event=class_create module=matrix_class status=ok matrix_id={matrix_id} class_id={class_id}");
        Ok(created)
    }

    pub fn get_class(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        class_id: MatrixClassId,
    ) -> ServiceResult<MatrixClass> {
        let repo = SqliteMatrixRepository::new(self.conn);
        load_owned_matrix(&repo, matrix_id, coordinator)?;
        load_class_in_matrix(&repo, class_id, matrix_id)
    }

    pub fn list_classes(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        filter: &MatrixClassFilter,
    ) -> ServiceResult<Vec<MatrixClass>> {
        let repo = SqliteMatrixRepository::new(self.conn);
        load_owned_matrix(&repo, matrix_id, coordinator)?;
        Ok(repo
            .list_classes_by_matrix(matrix_id)?
            .into_iter()
            .filter(|class| filter.matches(class))
            .collect())
    }

    /// Replaces professor, slot and authorized courses after the guards pass.
    ///
    /// Guard order: authorization narrowing, then schedule safety.
    pub fn update_class(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        class_id: MatrixClassId,
        request: UpdateClassRequest,
    ) -> ServiceResult<MatrixClass> {
        let started_at = Instant::now();
        let result = self.update_class_in_tx(coordinator, matrix_id, class_id, request);
        log_outcome("class_update", class_id, &result, started_at);
        result
    }

    /// Soft-deletes a class that has no enrollments.
    pub fn delete_class(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        class_id: MatrixClassId,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.delete_class_in_tx(coordinator, matrix_id, class_id);
        log_outcome("class_delete", class_id, &result, started_at);
        result
    }

    fn update_class_in_tx(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        class_id: MatrixClassId,
        request: UpdateClassRequest,
    ) -> ServiceResult<MatrixClass> {
        if request.authorized_course_ids.is_empty() {
            return Err(ServiceError::Validation(
                "at least one course must be authorized".to_string(),
            ));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let matrices = SqliteMatrixRepository::new(&tx);
        let enrollments = SqliteEnrollmentRepository::new(&tx);
        let reference = SqliteReferenceRepository::new(&tx);

        load_owned_matrix(&matrices, matrix_id, coordinator)?;
        let current = load_class_in_matrix(&matrices, class_id, matrix_id)?;

        if reference.get_professor(request.professor_id)?.is_none() {
            return Err(unknown_reference("professor", request.professor_id));
        }
        let new_slot = resolve_time_slot(&reference, request.time_slot_id)?;

        guard_authorization_narrowing(
            class_id,
            &current.authorized_course_ids,
            &request.authorized_course_ids,
            |course_id| enrollments.count_enrollments_for_course(class_id, course_id),
        )??;

        let slot_changed = new_slot.id != current.time_slot.id;
        if slot_changed {
            let roster = load_roster(&matrices, &enrollments, class_id)?;
            guard_schedule_change(class_id, &new_slot, &roster)?;

            if matrices.subject_slot_taken(
                matrix_id,
                current.subject_id,
                new_slot.id,
                Some(class_id),
            )? {
                return Err(Conflict::DuplicateSubjectSlot {
                    matrix_id,
                    subject_id: current.subject_id,
                    time_slot_id: new_slot.id,
                }
                .into());
            }
        }
        ensure_courses_exist(&reference, &request.authorized_course_ids)?;

        matrices.update_class(&MatrixClass {
            professor_id: request.professor_id,
            time_slot: new_slot,
            authorized_course_ids: request.authorized_course_ids,
            ..current
        })?;
        let updated = load_class_in_matrix(&matrices, class_id, matrix_id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_class_in_tx(
        &self,
        coordinator: &Coordinator,
        matrix_id: MatrixId,
        class_id: MatrixClassId,
    ) -> ServiceResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let matrices = SqliteMatrixRepository::new(&tx);
        let enrollments = SqliteEnrollmentRepository::new(&tx);

        load_owned_matrix(&matrices, matrix_id, coordinator)?;
        load_class_in_matrix(&matrices, class_id, matrix_id)?;
        guard_deletion(class_id, enrollments.count_enrollments(class_id)?)?;

        matrices.soft_delete_class(class_id)?;
        tx.commit()?;
        Ok(())
    }
}

/// Loads a visible class and checks it belongs to `matrix_id`.
fn load_class_in_matrix<R: MatrixRepository>(
    repo: &R,
    class_id: MatrixClassId,
    matrix_id: MatrixId,
) -> ServiceResult<MatrixClass> {
    let class = repo.get_class(class_id)?.ok_or(ServiceError::NotFound {
        entity: "class",
        id: class_id,
    })?;
    if class.matrix_id != matrix_id {
        return Err(ServiceError::Forbidden(format!(
            "class {class_id} belongs to another matrix"
        )));
    }
    Ok(class)
}

fn load_roster<M, E>(
    matrices: &M,
    enrollments: &E,
    class_id: MatrixClassId,
) -> Result<Vec<RosterEntry>, RepoError>
where
    M: MatrixRepository,
    E: EnrollmentRepository,
{
    enrollments
        .list_enrolled_student_ids(class_id)?
        .into_iter()
        .map(|student_id| {
            Ok(RosterEntry {
                student_id,
                classes: matrices.list_classes_enrolled_by(student_id)?,
            })
        })
        .collect()
}

fn resolve_time_slot<R: ReferenceRepository>(
    reference: &R,
    time_slot_id: TimeSlotId,
) -> ServiceResult<TimeSlot> {
    reference
        .get_time_slot(time_slot_id)?
        .ok_or_else(|| unknown_reference("time slot", time_slot_id))
}

fn ensure_courses_exist<R: ReferenceRepository>(
    reference: &R,
    course_ids: &BTreeSet<CourseId>,
) -> ServiceResult<()> {
    for course_id in course_ids {
        if reference.get_course(*course_id)?.is_none() {
            return Err(unknown_reference("course", *course_id));
        }
    }
    Ok(())
}

fn unknown_reference(entity: &str, id: Uuid) -> ServiceError {
    ServiceError::Validation(format!("{entity} not found: {id}"))
}

fn log_outcome<T>(
    event: &str,
    class_id: MatrixClassId,
    result: &ServiceResult<T>,
    started_at: Instant,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=matrix_class status=ok class_id={class_id} duration_ms={duration_ms}"
        ),
        Err(err) => warn!(
            "event={event} module=matrix_class status=rejected class_id={class_id} code={} duration_ms={duration_ms}",
            err.log_code()
        ),
    }
}
