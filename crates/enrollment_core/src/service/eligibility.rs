//! Ordered eligibility checks for enrolling a student into a class.
//!
//! # Responsibility
//! - Decide whether a student may take a seat, from state the caller has
//!   already read.
//! - Serve both candidate listing (silent filter) and enrollment gating
//!   (first conflict surfaced).
//!
//! # Invariants
//! - Checks run in `CHECKS` order and stop at the first failure, so a given
//!   state always reports the same conflict.
//! - Evaluation is pure; it never touches storage.

use crate::model::matrix::{MatrixClass, MatrixId};
use crate::model::time_slot::overlaps;
use crate::model::user::Student;
use crate::service::conflict::{Conflict, ConflictKind};

/// Storage-derived facts the checks read.
#[derive(Debug, Clone, Default)]
pub struct EligibilityContext {
    pub active_matrix_id: Option<MatrixId>,
    /// Current enrollments in the candidate class.
    pub enrolled_count: u32,
    pub already_enrolled: bool,
    /// Visible classes the student is enrolled in.
    pub student_classes: Vec<MatrixClass>,
}

type CheckFn = fn(&Student, &MatrixClass, &EligibilityContext) -> Option<Conflict>;

/// One named rule in the chain.
pub struct Check {
    pub kind: ConflictKind,
    run: CheckFn,
}

pub const CHECKS: [Check; 6] = [
    Check {
        kind: ConflictKind::MatrixInactive,
        run: check_matrix_active,
    },
    Check {
        kind: ConflictKind::UnauthorizedCourse,
        run: check_course_authorized,
    },
    Check {
        kind: ConflictKind::NoSeats,
        run: check_seats,
    },
    Check {
        kind: ConflictKind::AlreadyEnrolled,
        run: check_not_enrolled,
    },
    Check {
        kind: ConflictKind::DuplicateSubject,
        run: check_subject_free,
    },
    Check {
        kind: ConflictKind::ScheduleConflict,
        run: check_schedule_free,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Rejected(Conflict),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

pub fn evaluate(
    student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Eligibility {
    CHECKS
        .iter()
        .find_map(|check| (check.run)(student, class, context))
        .map_or(Eligibility::Eligible, Eligibility::Rejected)
}

/// Gating mode: the first failing check becomes the error.
pub fn gate(
    student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Result<(), Conflict> {
    match evaluate(student, class, context) {
        Eligibility::Eligible => Ok(()),
        Eligibility::Rejected(conflict) => Err(conflict),
    }
}

/// Listing mode: ineligible classes are simply left out.
pub fn is_listable(student: &Student, class: &MatrixClass, context: &EligibilityContext) -> bool {
    evaluate(student, class, context).is_eligible()
}

fn check_matrix_active(
    _student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Option<Conflict> {
    (context.active_matrix_id != Some(class.matrix_id)).then_some(Conflict::MatrixInactive {
        class_id: class.id,
        matrix_id: class.matrix_id,
    })
}

fn check_course_authorized(
    student: &Student,
    class: &MatrixClass,
    _context: &EligibilityContext,
) -> Option<Conflict> {
    match student.course_id {
        Some(course_id) if class.authorizes(course_id) => None,
        course_id => Some(Conflict::UnauthorizedCourse {
            class_id: class.id,
            course_id,
        }),
    }
}

fn check_seats(
    _student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Option<Conflict> {
    (context.enrolled_count >= class.max_students).then_some(Conflict::NoSeats {
        class_id: class.id,
        max_students: class.max_students,
    })
}

fn check_not_enrolled(
    _student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Option<Conflict> {
    context
        .already_enrolled
        .then_some(Conflict::AlreadyEnrolled { class_id: class.id })
}

fn check_subject_free(
    _student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Option<Conflict> {
    context
        .student_classes
        .iter()
        .find(|held| held.id != class.id && held.subject_id == class.subject_id)
        .map(|held| Conflict::DuplicateSubject {
            subject_id: class.subject_id,
            enrolled_class_id: held.id,
        })
}

fn check_schedule_free(
    student: &Student,
    class: &MatrixClass,
    context: &EligibilityContext,
) -> Option<Conflict> {
    context
        .student_classes
        .iter()
        .find(|held| held.id != class.id && overlaps(&held.time_slot, &class.time_slot))
        .map(|held| Conflict::ScheduleConflict {
            student_id: student.id,
            class_id: class.id,
            conflicting_class_id: held.id,
        })
}
