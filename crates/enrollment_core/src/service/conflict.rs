//! Business-rule conflicts surfaced to callers.
//!
//! # Invariants
//! - `ConflictKind::code()` strings are stable and part of the public contract.

use crate::model::matrix::{MatrixClassId, MatrixId};
use crate::model::reference::{CourseId, SubjectId};
use crate::model::time_slot::TimeSlotId;
use crate::model::user::UserId;
use std::fmt::{Display, Formatter};

/// Stable conflict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    MatrixInactive,
    UnauthorizedCourse,
    NoSeats,
    AlreadyEnrolled,
    DuplicateSubject,
    ScheduleConflict,
    InvalidateEnrollments,
    HasEnrollments,
    DuplicateSubjectSlot,
}

impl ConflictKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::MatrixInactive => "MATRIX_INACTIVE",
            Self::UnauthorizedCourse => "UNAUTHORIZED_COURSE",
            Self::NoSeats => "NO_SEATS",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::DuplicateSubject => "DUPLICATE_SUBJECT",
            Self::ScheduleConflict => "SCHEDULE_CONFLICT",
            Self::InvalidateEnrollments => "INVALIDATE_ENROLLMENTS",
            Self::HasEnrollments => "HAS_ENROLLMENTS",
            Self::DuplicateSubjectSlot => "DUPLICATE_SUBJECT_SLOT",
        }
    }
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected enrollment or class mutation, with the rows involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The class belongs to a matrix that is not the active one.
    MatrixInactive {
        class_id: MatrixClassId,
        matrix_id: MatrixId,
    },
    /// The student's course is missing or not in the class's authorized set.
    UnauthorizedCourse {
        class_id: MatrixClassId,
        course_id: Option<CourseId>,
    },
    NoSeats {
        class_id: MatrixClassId,
        max_students: u32,
    },
    AlreadyEnrolled { class_id: MatrixClassId },
    /// The student already holds a class of the same subject.
    DuplicateSubject {
        subject_id: SubjectId,
        enrolled_class_id: MatrixClassId,
    },
    /// `student_id` would hold both classes at overlapping times.
    ScheduleConflict {
        student_id: UserId,
        class_id: MatrixClassId,
        conflicting_class_id: MatrixClassId,
    },
    /// An update would revoke courses that enrolled students belong to.
    InvalidateEnrollments {
        class_id: MatrixClassId,
        course_ids: Vec<CourseId>,
    },
    HasEnrollments {
        class_id: MatrixClassId,
        enrollment_count: u32,
    },
    DuplicateSubjectSlot {
        matrix_id: MatrixId,
        subject_id: SubjectId,
        time_slot_id: TimeSlotId,
    },
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match self {
            Self::MatrixInactive { .. } => ConflictKind::MatrixInactive,
            Self::UnauthorizedCourse { .. } => ConflictKind::UnauthorizedCourse,
            Self::NoSeats { .. } => ConflictKind::NoSeats,
            Self::AlreadyEnrolled { .. } => ConflictKind::AlreadyEnrolled,
            Self::DuplicateSubject { .. } => ConflictKind::DuplicateSubject,
            Self::ScheduleConflict { .. } => ConflictKind::ScheduleConflict,
            Self::InvalidateEnrollments { .. } => ConflictKind::InvalidateEnrollments,
            Self::HasEnrollments { .. } => ConflictKind::HasEnrollments,
            Self::DuplicateSubjectSlot { .. } => ConflictKind::DuplicateSubjectSlot,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.code())?;
        match self {
            Self::MatrixInactive {
                class_id,
                matrix_id,
            } => write!(f, "class {class_id} belongs to inactive matrix {matrix_id}"),
            Self::UnauthorizedCourse {
                class_id,
                course_id: Some(course_id),
            } => write!(f, "course {course_id} is not authorized for class {class_id}"),
            Self::UnauthorizedCourse {
                class_id,
                course_id: None,
            } => write!(f, "student has no course; class {class_id} requires one"),
            Self::NoSeats {
                class_id,
                max_students,
            } => write!(f, "class {class_id} is full ({max_students} seats)"),
            Self::AlreadyEnrolled { class_id } => {
                write!(f, "student already enrolled in class {class_id}")
            }
            Self::DuplicateSubject {
                subject_id,
                enrolled_class_id,
            } => write!(
                f,
                "subject {subject_id} already taken in class {enrolled_class_id}"
            ),
            Self::ScheduleConflict {
                student_id,
                class_id,
                conflicting_class_id,
            } => write!(
                f,
                "class {class_id} overlaps class {conflicting_class_id} for student {student_id}"
            ),
            Self::InvalidateEnrollments {
                class_id,
                course_ids,
            } => {
                let joined = course_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(
                    f,
                    "class {class_id} has students enrolled from removed courses [{joined}]"
                )
            }
            Self::HasEnrollments {
                class_id,
                enrollment_count,
            } => write!(
                f,
                "class {class_id} has {enrollment_count} enrolled student(s)"
            ),
            Self::DuplicateSubjectSlot {
                matrix_id,
                subject_id,
                time_slot_id,
            } => write!(
                f,
                "matrix {matrix_id} already offers subject {subject_id} at slot {time_slot_id}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Conflict, ConflictKind};
    use uuid::Uuid;

    #[test]
    fn display_leads_with_stable_code() {
        let conflict = Conflict::NoSeats {
            class_id: Uuid::nil(),
            max_students: 3,
        };
        assert_eq!(conflict.kind(), ConflictKind::NoSeats);
        assert!(conflict.to_string().starts_with("NO_SEATS: "));
    }

    #[test]
    fn missing_course_has_its_own_message() {
        let conflict = Conflict::UnauthorizedCourse {
            class_id: Uuid::nil(),
            course_id: None,
        };
        assert_eq!(conflict.code(), "UNAUTHORIZED_COURSE");
        assert!(conflict.to_string().contains("has no course"));
    }
}
