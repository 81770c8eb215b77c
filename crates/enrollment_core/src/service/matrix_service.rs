//! Curriculum matrix use cases, including active-matrix selection.
//!
//! # Responsibility
//! - Create and list coordinator-owned matrices.
//! - Switch the system-wide active matrix.
//!
//! # Invariants
//! - New matrices start inactive with a trimmed, non-blank name.
//! - `activate` leaves exactly one visible matrix active, even when storage
//!   previously held several.
//! - Only the owning coordinator may read or activate a matrix.

use crate::model::matrix::{CurriculumMatrix, MatrixId, MatrixSummary};
use crate::model::user::Coordinator;
use crate::repo::matrix_repo::{MatrixRepository, SqliteMatrixRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

pub struct MatrixService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MatrixService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create_matrix(
        &self,
        coordinator: &Coordinator,
        name: &str,
    ) -> ServiceResult<CurriculumMatrix> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "matrix name must not be blank".to_string(),
            ));
        }

        let repo = SqliteMatrixRepository::new(self.conn);
        let matrix_id = repo.create_matrix(&CurriculumMatrix {
            id: Uuid::new_v4(),
            name: name.to_string(),
            coordinator_id: coordinator.id,
            active: false,
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
        })?;
        info!("event=matrix_create module=matrix status=ok matrix_id={matrix_id}");

        repo.get_matrix(matrix_id)?.ok_or(ServiceError::NotFound {
            entity: "matrix",
            id: matrix_id,
        })
    }

    /// Newest first, with live class counts.
    pub fn list_by_coordinator(
        &self,
        coordinator: &Coordinator,
    ) -> ServiceResult<Vec<MatrixSummary>> {
        Ok(SqliteMatrixRepository::new(self.conn).list_matrix_summaries(coordinator.id)?)
    }

    pub fn get_by_id_and_coordinator(
        &self,
        matrix_id: MatrixId,
        coordinator: &Coordinator,
    ) -> ServiceResult<CurriculumMatrix> {
        load_owned_matrix(&SqliteMatrixRepository::new(self.conn), matrix_id, coordinator)
    }

    /// Makes `matrix_id` the only active matrix.
    pub fn activate(
        &self,
        matrix_id: MatrixId,
        coordinator: &Coordinator,
    ) -> ServiceResult<CurriculumMatrix> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let repo = SqliteMatrixRepository::new(&tx);

        load_owned_matrix(&repo, matrix_id, coordinator)?;

        let previously_active = repo.find_all_active_matrices()?;
        if previously_active.len() > 1 {
            warn!(
                "event=matrix_activate module=matrix status=repair active_count={}",
                previously_active.len()
            );
        }
        for matrix in &previously_active {
            repo.set_matrix_active(matrix.id, false)?;
        }
        repo.set_matrix_active(matrix_id, true)?;

        let activated = repo.get_matrix(matrix_id)?.ok_or(ServiceError::NotFound {
            entity: "matrix",
            id: matrix_id,
        })?;
        tx.commit()?;

        info!(
            "event=matrix_activate module=matrix status=ok matrix_id={matrix_id} deactivated={} duration_ms={}",
            previously_active
                .iter()
                .filter(|matrix| matrix.id != matrix_id)
                .count(),
            started_at.elapsed().as_millis()
        );
        Ok(activated)
    }
}

/// Loads a visible matrix and checks the caller owns it.
pub(crate) fn load_owned_matrix<R: MatrixRepository>(
    repo: &R,
    matrix_id: MatrixId,
    coordinator: &Coordinator,
) -> ServiceResult<CurriculumMatrix> {
    let matrix = repo.get_matrix(matrix_id)?.ok_or(ServiceError::NotFound {
        entity: "matrix",
        id: matrix_id,
    })?;
    if matrix.coordinator_id != coordinator.id {
        return Err(ServiceError::Forbidden(format!(
            "matrix {matrix_id} belongs to another coordinator"
        )));
    }
    Ok(matrix)
}
