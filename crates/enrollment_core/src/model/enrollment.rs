//! Enrollment relationship record.
//!
//! # Invariants
//! - Created once by the enrollment engine and never mutated.
//! - Becomes invisible, not deleted, when its class is soft-deleted.

use crate::model::matrix::MatrixClassId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EnrollmentId = Uuid;

/// One student occupying one seat of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub class_id: MatrixClassId,
    pub student_id: UserId,
    /// Unix epoch milliseconds.
    pub enrolled_at: i64,
}
