mod common;

use common::add_coordinator;
use enrollment_core::db::open_db_in_memory;
use enrollment_core::repo::matrix_repo::{MatrixRepository, SqliteMatrixRepository};
use enrollment_core::{MatrixService, ServiceError};
use uuid::Uuid;

#[test]
fn new_matrix_is_trimmed_and_inactive() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = add_coordinator(&conn, "carmen@uni.example");

    let matrix = MatrixService::new(&conn)
        .create_matrix(&coordinator, "  2026.1  ")
        .unwrap();
    assert_eq!(matrix.name, "2026.1");
    assert!(!matrix.active);
    assert_eq!(matrix.coordinator_id, coordinator.id);
}

#[test]
fn blank_matrix_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = add_coordinator(&conn, "carmen@uni.example");

    let err = MatrixService::new(&conn)
        .create_matrix(&coordinator, "   ")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn activating_b_while_a_is_active_leaves_only_b() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = add_coordinator(&conn, "carmen@uni.example");
    let service = MatrixService::new(&conn);
    let a = service.create_matrix(&coordinator, "A").unwrap();
    let b = service.create_matrix(&coordinator, "B").unwrap();

    service.activate(a.id, &coordinator).unwrap();
    let activated = service.activate(b.id, &coordinator).unwrap();
    assert!(activated.active);

    let repo = SqliteMatrixRepository::new(&conn);
    let active = repo.find_all_active_matrices().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);
    assert!(!service.get_by_id_and_coordinator(a.id, &coordinator).unwrap().active);
}

#[test]
fn reactivating_the_active_matrix_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = add_coordinator(&conn, "carmen@uni.example");
    let service = MatrixService::new(&conn);
    let a = service.create_matrix(&coordinator, "A").unwrap();

    service.activate(a.id, &coordinator).unwrap();
    service.activate(a.id, &coordinator).unwrap();

    let active = SqliteMatrixRepository::new(&conn)
        .find_active_matrix()
        .unwrap()
        .unwrap();
    assert_eq!(active.id, a.id);
}

#[test]
fn activation_requires_ownership() {
    let conn = open_db_in_memory().unwrap();
    let owner = add_coordinator(&conn, "carmen@uni.example");
    let stranger = add_coordinator(&conn, "rafael@uni.example");
    let service = MatrixService::new(&conn);
    let a = service.create_matrix(&owner, "A").unwrap();
    service.activate(a.id, &owner).unwrap();
    let b = service.create_matrix(&owner, "B").unwrap();

    let err = service.activate(b.id, &stranger).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = service.activate(Uuid::new_v4(), &owner).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "matrix", .. }));

    // Rejected activations leave the previous selection untouched.
    let active = SqliteMatrixRepository::new(&conn)
        .find_active_matrix()
        .unwrap()
        .unwrap();
    assert_eq!(active.id, a.id);
}

#[test]
fn activation_repairs_multiple_active_rows() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = add_coordinator(&conn, "carmen@uni.example");
    let service = MatrixService::new(&conn);
    let a = service.create_matrix(&coordinator, "A").unwrap();
    let b = service.create_matrix(&coordinator, "B").unwrap();
    let c = service.create_matrix(&coordinator, "C").unwrap();

    // Simulate a legacy database that predates the single-active index.
    conn.execute_batch("DROP INDEX idx_curriculum_matrices_single_active;")
        .unwrap();
    conn.execute(
        "UPDATE curriculum_matrices SET active = 1 WHERE uuid IN (?1, ?2);",
        [a.id.to_string(), b.id.to_string()],
    )
    .unwrap();

    service.activate(c.id, &coordinator).unwrap();

    let active = SqliteMatrixRepository::new(&conn)
        .find_all_active_matrices()
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, c.id);
}

#[test]
fn summaries_belong_to_the_coordinator() {
    let conn = open_db_in_memory().unwrap();
    let owner = add_coordinator(&conn, "carmen@uni.example");
    let other = add_coordinator(&conn, "rafael@uni.example");
    let service = MatrixService::new(&conn);
    let mine = service.create_matrix(&owner, "Mine").unwrap();
    service.create_matrix(&other, "Theirs").unwrap();

    let summaries = service.list_by_coordinator(&owner).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, mine.id);
    assert_eq!(summaries[0].class_count, 0);

    let err = service
        .get_by_id_and_coordinator(mine.id, &other)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
