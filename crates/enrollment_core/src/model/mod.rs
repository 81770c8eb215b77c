//! Domain model for curriculum matrices, classes and enrollments.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep pure schedule logic (`time_slot::overlaps`) next to the data it
//!   reads.
//!
//! # Invariants
//! - Every domain object is identified by a stable `Uuid`.
//! - Matrices and classes are soft-deleted via `deleted_at`, never erased.

pub mod enrollment;
pub mod matrix;
pub mod reference;
pub mod time_slot;
pub mod user;
