//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into enrollment and curriculum use cases.
//! - Own transaction boundaries; repositories never open transactions.
//!
//! # Invariants
//! - Every write runs in an IMMEDIATE transaction on the caller's connection.
//! - Rejections surface as `ServiceError`; the open transaction rolls back on
//!   drop.

pub mod class_guard;
pub mod conflict;
pub mod eligibility;
pub mod enrollment_service;
pub mod error;
pub mod identity_service;
pub mod matrix_class_service;
pub mod matrix_service;
