//! Curriculum matrices and the classes they offer.
//!
//! # Responsibility
//! - Define the coordinator-owned matrix and its scheduled classes.
//! - Validate class shape before persistence.
//!
//! # Invariants
//! - At most one visible matrix is active system-wide.
//! - `max_students >= 1` and the authorized course set is non-empty.
//! - Within one matrix, `(subject_id, time_slot.id)` is unique among visible
//!   classes.
//! - `deleted_at` is the soft-delete tombstone; hidden rows keep history.

use crate::model::reference::{CourseId, ProfessorId, SubjectId};
use crate::model::time_slot::TimeSlot;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MatrixId = Uuid;
pub type MatrixClassId = Uuid;

/// Coordinator-authored curriculum version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumMatrix {
    pub id: MatrixId,
    pub name: String,
    pub coordinator_id: UserId,
    pub active: bool,
    /// Epoch ms tombstone. `Some` hides the matrix from every query.
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Matrix list row with its visible class count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub id: MatrixId,
    pub name: String,
    pub active: bool,
    pub class_count: u32,
    pub created_at: i64,
}

/// Shape errors for a class definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixClassValidationError {
    /// Capacity must allow at least one student.
    CapacityTooSmall(u32),
    /// At least one course must be authorized.
    NoAuthorizedCourses,
}

impl Display for MatrixClassValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityTooSmall(value) => {
                write!(f, "max_students must be at least 1, got {value}")
            }
            Self::NoAuthorizedCourses => write!(f, "at least one course must be authorized"),
        }
    }
}

impl Error for MatrixClassValidationError {}

/// One scheduled offering of a subject within a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixClass {
    pub id: MatrixClassId,
    pub matrix_id: MatrixId,
    pub subject_id: SubjectId,
    pub professor_id: ProfessorId,
    /// Loaded with the class so schedule checks need no extra lookup.
    pub time_slot: TimeSlot,
    pub max_students: u32,
    pub authorized_course_ids: BTreeSet<CourseId>,
    pub deleted_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MatrixClass {
    pub fn validate(&self) -> Result<(), MatrixClassValidationError> {
        validate_class_shape(self.max_students, &self.authorized_course_ids)
    }

    /// Whether a student of `course_id` may enroll.
    pub fn authorizes(&self, course_id: CourseId) -> bool {
        self.authorized_course_ids.contains(&course_id)
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Shape rules shared by class creation and update.
pub fn validate_class_shape(
    max_students: u32,
    authorized_course_ids: &BTreeSet<CourseId>,
) -> Result<(), MatrixClassValidationError> {
    if max_students < 1 {
        return Err(MatrixClassValidationError::CapacityTooSmall(max_students));
    }
    if authorized_course_ids.is_empty() {
        return Err(MatrixClassValidationError::NoAuthorizedCourses);
    }
    Ok(())
}
