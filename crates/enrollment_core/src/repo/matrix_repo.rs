//! Curriculum matrix and matrix class repository.
//!
//! # Responsibility
//! - Persist matrices, classes and the class/course authorization relation.
//! - Provide the lock-acquiring class fetch used by the enrollment engine.
//!
//! # Invariants
//! - Default reads return only visible rows: the class and its matrix both
//!   have `deleted_at IS NULL`.
//! - Class writes validate shape (`MatrixClass::validate`) before SQL.
//! - Multi-statement writes (`create_class`, `update_class`) are only atomic
//!   when the caller runs them inside a transaction.

use crate::model::matrix::{CurriculumMatrix, MatrixClass, MatrixClassId, MatrixId, MatrixSummary};
use crate::model::reference::{CourseId, SubjectId};
use crate::model::time_slot::TimeSlotId;
use crate::model::user::UserId;
use crate::repo::reference_repo::parse_time_slot_row;
use crate::repo::{
    bool_to_int, parse_bool, parse_count, parse_uuid, RepoError, RepoResult, VISIBLE_CLASS,
    VISIBLE_MATRIX,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

const MATRIX_SELECT_SQL: &str = "SELECT
    m.uuid AS uuid,
    m.name AS name,
    m.coordinator_uuid AS coordinator_uuid,
    m.active AS active,
    m.deleted_at AS deleted_at,
    m.created_at AS created_at,
    m.updated_at AS updated_at
FROM curriculum_matrices m";

const CLASS_SELECT_SQL: &str = "SELECT
    c.uuid AS uuid,
    c.matrix_uuid AS matrix_uuid,
    c.subject_uuid AS subject_uuid,
    c.professor_uuid AS professor_uuid,
    c.max_students AS max_students,
    c.deleted_at AS deleted_at,
    c.created_at AS created_at,
    c.updated_at AS updated_at,
    ts.uuid AS ts_uuid,
    ts.day_of_week AS ts_day_of_week,
    ts.start_minute AS ts_start_minute,
    ts.end_minute AS ts_end_minute,
    ts.code AS ts_code
FROM matrix_classes c
INNER JOIN time_slots ts ON ts.uuid = c.time_slot_uuid
INNER JOIN curriculum_matrices m ON m.uuid = c.matrix_uuid";

/// Repository interface for matrices and their classes.
pub trait MatrixRepository {
    fn create_matrix(&self, matrix: &CurriculumMatrix) -> RepoResult<MatrixId>;
    fn get_matrix(&self, id: MatrixId) -> RepoResult<Option<CurriculumMatrix>>;
    /// Summaries ordered by creation time, newest first.
    fn list_matrix_summaries(&self, coordinator_id: UserId) -> RepoResult<Vec<MatrixSummary>>;
    fn find_active_matrix(&self) -> RepoResult<Option<CurriculumMatrix>>;
    fn find_all_active_matrices(&self) -> RepoResult<Vec<CurriculumMatrix>>;
    fn set_matrix_active(&self, id: MatrixId, active: bool) -> RepoResult<()>;

    /// Inserts the class row and its authorized courses.
    fn create_class(&self, class: &MatrixClass) -> RepoResult<MatrixClassId>;
    fn get_class(&self, id: MatrixClassId) -> RepoResult<Option<MatrixClass>>;
    /// Takes the class's write lock, then loads it.
    ///
    /// Valid only inside an open IMMEDIATE transaction; the lock is held
    /// until that transaction ends. Returns `None` for missing or hidden
    /// classes without taking the lock.
    fn lock_class_for_update(&self, id: MatrixClassId) -> RepoResult<Option<MatrixClass>>;
    fn list_classes_by_matrix(&self, matrix_id: MatrixId) -> RepoResult<Vec<MatrixClass>>;
    /// Visible classes the student holds an enrollment in.
    fn list_classes_enrolled_by(&self, student_id: UserId) -> RepoResult<Vec<MatrixClass>>;
    /// Replaces professor, slot, capacity and the authorized course set.
    fn update_class(&self, class: &MatrixClass) -> RepoResult<()>;
    fn soft_delete_class(&self, id: MatrixClassId) -> RepoResult<()>;
    /// Whether a visible class other than `excluding` already offers
    /// `subject_id` at `time_slot_id` in the matrix.
    fn subject_slot_taken(
        &self,
        matrix_id: MatrixId,
        subject_id: SubjectId,
        time_slot_id: TimeSlotId,
        excluding: Option<MatrixClassId>,
    ) -> RepoResult<bool>;
}

/// SQLite-backed matrix repository.
pub struct SqliteMatrixRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMatrixRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_matrices(
        &self,
        sql: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> RepoResult<Vec<CurriculumMatrix>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut matrices = Vec::new();
        while let Some(row) = rows.next()? {
            matrices.push(parse_matrix_row(row)?);
        }
        Ok(matrices)
    }

    fn query_classes(
        &self,
        sql: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> RepoResult<Vec<MatrixClass>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut classes = Vec::new();
        while let Some(row) = rows.next()? {
            let mut class = parse_class_row(row)?;
            class.authorized_course_ids = load_authorized_courses(self.conn, class.id)?;
            classes.push(class);
        }
        Ok(classes)
    }
}

impl MatrixRepository for SqliteMatrixRepository<'_> {
    fn create_matrix(&self, matrix: &CurriculumMatrix) -> RepoResult<MatrixId> {
        self.conn.execute(
            "INSERT INTO curriculum_matrices (
                uuid,
                name,
                coordinator_uuid,
                active
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                matrix.id.to_string(),
                matrix.name.as_str(),
                matrix.coordinator_id.to_string(),
                bool_to_int(matrix.active),
            ],
        )?;
        Ok(matrix.id)
    }

    fn get_matrix(&self, id: MatrixId) -> RepoResult<Option<CurriculumMatrix>> {
        let sql = format!("{MATRIX_SELECT_SQL} WHERE m.uuid = ?1 AND {VISIBLE_MATRIX};");
        Ok(self
            .query_matrices(&sql, &[&id.to_string()])?
            .into_iter()
            .next())
    }

    fn list_matrix_summaries(&self, coordinator_id: UserId) -> RepoResult<Vec<MatrixSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                m.uuid AS uuid,
                m.name AS name,
                m.active AS active,
                m.created_at AS created_at,
                (
                    SELECT COUNT(*)
                    FROM matrix_classes c
                    WHERE c.matrix_uuid = m.uuid
                      AND {VISIBLE_CLASS}
                ) AS class_count
             FROM curriculum_matrices m
             WHERE m.coordinator_uuid = ?1
               AND {VISIBLE_MATRIX}
             ORDER BY m.created_at DESC, m.uuid ASC;"
        ))?;
        let mut rows = stmt.query([coordinator_id.to_string()])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("uuid")?;
            summaries.push(MatrixSummary {
                id: parse_uuid(&id_text, "curriculum_matrices.uuid")?,
                name: row.get("name")?,
                active: parse_bool(row.get("active")?, "curriculum_matrices.active")?,
                class_count: parse_count(row.get("class_count")?, "class_count")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(summaries)
    }

    fn find_active_matrix(&self) -> RepoResult<Option<CurriculumMatrix>> {
        Ok(self.find_all_active_matrices()?.into_iter().next())
    }

    fn find_all_active_matrices(&self) -> RepoResult<Vec<CurriculumMatrix>> {
        let sql = format!(
            "{MATRIX_SELECT_SQL}
             WHERE m.active = 1
               AND {VISIBLE_MATRIX}
             ORDER BY m.updated_at DESC, m.uuid ASC;"
        );
        self.query_matrices(&sql, &[])
    }

    fn set_matrix_active(&self, id: MatrixId, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE curriculum_matrices
             SET active = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), bool_to_int(active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "matrix",
                id,
            });
        }
        Ok(())
    }

    fn create_class(&self, class: &MatrixClass) -> RepoResult<MatrixClassId> {
        class.validate()?;

        self.conn.execute(
            "INSERT INTO matrix_classes (
                uuid,
                matrix_uuid,
                subject_uuid,
                professor_uuid,
                time_slot_uuid,
                max_students
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                class.id.to_string(),
                class.matrix_id.to_string(),
                class.subject_id.to_string(),
                class.professor_id.to_string(),
                class.time_slot.id.to_string(),
                class.max_students,
            ],
        )?;
        replace_authorized_courses(self.conn, class.id, &class.authorized_course_ids)?;
        Ok(class.id)
    }

    fn get_class(&self, id: MatrixClassId) -> RepoResult<Option<MatrixClass>> {
        let sql = format!(
            "{CLASS_SELECT_SQL}
             WHERE c.uuid = ?1
               AND {VISIBLE_CLASS}
               AND {VISIBLE_MATRIX};"
        );
        Ok(self.query_classes(&sql, &[&id.to_string()])?.into_iter().next())
    }

    fn lock_class_for_update(&self, id: MatrixClassId) -> RepoResult<Option<MatrixClass>> {
        let Some(class) = self.get_class(id)? else {
            return Ok(None);
        };

        // Writing the row is what takes SQLite's reserved lock when the
        // surrounding transaction has not done so already.
        self.conn.execute(
            "UPDATE matrix_classes
             SET lock_version = lock_version + 1
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            [id.to_string()],
        )?;
        Ok(Some(class))
    }

    fn list_classes_by_matrix(&self, matrix_id: MatrixId) -> RepoResult<Vec<MatrixClass>> {
        let sql = format!(
            "{CLASS_SELECT_SQL}
             WHERE c.matrix_uuid = ?1
               AND {VISIBLE_CLASS}
               AND {VISIBLE_MATRIX}
             ORDER BY c.created_at ASC, c.uuid ASC;"
        );
        self.query_classes(&sql, &[&matrix_id.to_string()])
    }

    fn list_classes_enrolled_by(&self, student_id: UserId) -> RepoResult<Vec<MatrixClass>> {
        let sql = format!(
            "{CLASS_SELECT_SQL}
             INNER JOIN enrollments e ON e.class_uuid = c.uuid
             WHERE e.student_uuid = ?1
               AND {VISIBLE_CLASS}
             ORDER BY e.enrolled_at ASC, c.uuid ASC;"
        );
        self.query_classes(&sql, &[&student_id.to_string()])
    }

    fn update_class(&self, class: &MatrixClass) -> RepoResult<()> {
        class.validate()?;

        let changed = self.conn.execute(
            "UPDATE matrix_classes
             SET professor_uuid = ?2,
                 time_slot_uuid = ?3,
                 max_students = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            params![
                class.id.to_string(),
                class.professor_id.to_string(),
                class.time_slot.id.to_string(),
                class.max_students,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "class",
                id: class.id,
            });
        }

        replace_authorized_courses(self.conn, class.id, &class.authorized_course_ids)
    }

    fn soft_delete_class(&self, id: MatrixClassId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE matrix_classes
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND deleted_at IS NULL;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "class",
                id,
            });
        }
        Ok(())
    }

    fn subject_slot_taken(
        &self,
        matrix_id: MatrixId,
        subject_id: SubjectId,
        time_slot_id: TimeSlotId,
        excluding: Option<MatrixClassId>,
    ) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1
                    FROM matrix_classes c
                    WHERE c.matrix_uuid = ?1
                      AND c.subject_uuid = ?2
                      AND c.time_slot_uuid = ?3
                      AND (?4 IS NULL OR c.uuid <> ?4)
                      AND {VISIBLE_CLASS}
                );"
            ),
            params![
                matrix_id.to_string(),
                subject_id.to_string(),
                time_slot_id.to_string(),
                excluding.map(|value| value.to_string()),
            ],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }
}

fn replace_authorized_courses(
    conn: &Connection,
    class_id: MatrixClassId,
    course_ids: &BTreeSet<CourseId>,
) -> RepoResult<()> {
    let class_text = class_id.to_string();
    conn.execute(
        "DELETE FROM matrix_class_courses WHERE class_uuid = ?1;",
        [class_text.as_str()],
    )?;
    for course_id in course_ids {
        conn.execute(
            "INSERT INTO matrix_class_courses (class_uuid, course_uuid) VALUES (?1, ?2);",
            params![class_text.as_str(), course_id.to_string()],
        )?;
    }
    Ok(())
}

fn load_authorized_courses(
    conn: &Connection,
    class_id: MatrixClassId,
) -> RepoResult<BTreeSet<CourseId>> {
    let mut stmt = conn.prepare(
        "SELECT course_uuid
         FROM matrix_class_courses
         WHERE class_uuid = ?1;",
    )?;
    let mut rows = stmt.query([class_id.to_string()])?;
    let mut courses = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        courses.insert(parse_uuid(&value, "matrix_class_courses.course_uuid")?);
    }
    Ok(courses)
}

fn parse_matrix_row(row: &Row<'_>) -> RepoResult<CurriculumMatrix> {
    let id_text: String = row.get("uuid")?;
    let coordinator_text: String = row.get("coordinator_uuid")?;
    Ok(CurriculumMatrix {
        id: parse_uuid(&id_text, "curriculum_matrices.uuid")?,
        name: row.get("name")?,
        coordinator_id: parse_uuid(&coordinator_text, "curriculum_matrices.coordinator_uuid")?,
        active: parse_bool(row.get("active")?, "curriculum_matrices.active")?,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Parses the class columns; the authorized course set is loaded separately.
fn parse_class_row(row: &Row<'_>) -> RepoResult<MatrixClass> {
    let id_text: String = row.get("uuid")?;
    let matrix_text: String = row.get("matrix_uuid")?;
    let subject_text: String = row.get("subject_uuid")?;
    let professor_text: String = row.get("professor_uuid")?;
    let max_students: i64 = row.get("max_students")?;

    Ok(MatrixClass {
        id: parse_uuid(&id_text, "matrix_classes.uuid")?,
        matrix_id: parse_uuid(&matrix_text, "matrix_classes.matrix_uuid")?,
        subject_id: parse_uuid(&subject_text, "matrix_classes.subject_uuid")?,
        professor_id: parse_uuid(&professor_text, "matrix_classes.professor_uuid")?,
        time_slot: parse_time_slot_row(row, "ts_")?,
        max_students: parse_count(max_students, "matrix_classes.max_students")?,
        authorized_course_ids: BTreeSet::new(),
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
