//! Enrollment repository.
//!
//! # Invariants
//! - `(class, student)` is unique; the schema enforces it as a backstop to
//!   the engine's own check.
//! - Per-student reads only consider enrollments in visible classes.

use crate::model::enrollment::{Enrollment, EnrollmentId};
use crate::model::matrix::MatrixClassId;
use crate::model::reference::CourseId;
use crate::model::user::UserId;
use crate::repo::{parse_count, parse_uuid, RepoResult, VISIBLE_CLASS};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const ENROLLMENT_SELECT_SQL: &str = "SELECT
    e.uuid AS uuid,
    e.class_uuid AS class_uuid,
    e.student_uuid AS student_uuid,
    e.enrolled_at AS enrolled_at
FROM enrollments e";

/// Repository interface for enrollment rows.
pub trait EnrollmentRepository {
    /// Inserts a new enrollment and returns it with its server timestamp.
    fn create_enrollment(
        &self,
        class_id: MatrixClassId,
        student_id: UserId,
    ) -> RepoResult<Enrollment>;
    fn count_enrollments(&self, class_id: MatrixClassId) -> RepoResult<u32>;
    fn exists_enrollment(&self, class_id: MatrixClassId, student_id: UserId) -> RepoResult<bool>;
    fn find_enrollments_by_student(&self, student_id: UserId) -> RepoResult<Vec<Enrollment>>;
    /// Enrollments in the class held by students of `course_id`.
    fn count_enrollments_for_course(
        &self,
        class_id: MatrixClassId,
        course_id: CourseId,
    ) -> RepoResult<u32>;
    fn list_enrolled_student_ids(&self, class_id: MatrixClassId) -> RepoResult<Vec<UserId>>;
}

/// SQLite-backed enrollment repository.
pub struct SqliteEnrollmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEnrollmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository<'_> {
    fn create_enrollment(
        &self,
        class_id: MatrixClassId,
        student_id: UserId,
    ) -> RepoResult<Enrollment> {
        let id: EnrollmentId = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO enrollments (
                uuid,
                class_uuid,
                student_uuid
            ) VALUES (?1, ?2, ?3);",
            params![id.to_string(), class_id.to_string(), student_id.to_string()],
        )?;

        let enrolled_at: i64 = self.conn.query_row(
            "SELECT enrolled_at FROM enrollments WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(Enrollment {
            id,
            class_id,
            student_id,
            enrolled_at,
        })
    }

    fn count_enrollments(&self, class_id: MatrixClassId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE class_uuid = ?1;",
            [class_id.to_string()],
            |row| row.get(0),
        )?;
        parse_count(count, "enrollments.count")
    }

    fn exists_enrollment(&self, class_id: MatrixClassId, student_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM enrollments
                WHERE class_uuid = ?1
                  AND student_uuid = ?2
            );",
            params![class_id.to_string(), student_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_enrollments_by_student(&self, student_id: UserId) -> RepoResult<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENROLLMENT_SELECT_SQL}
             INNER JOIN matrix_classes c ON c.uuid = e.class_uuid
             WHERE e.student_uuid = ?1
               AND {VISIBLE_CLASS}
             ORDER BY e.enrolled_at ASC, e.uuid ASC;"
        ))?;
        let mut rows = stmt.query([student_id.to_string()])?;
        let mut enrollments = Vec::new();
        while let Some(row) = rows.next()? {
            enrollments.push(parse_enrollment_row(row)?);
        }
        Ok(enrollments)
    }

    fn count_enrollments_for_course(
        &self,
        class_id: MatrixClassId,
        course_id: CourseId,
    ) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM enrollments e
             INNER JOIN users u ON u.uuid = e.student_uuid
             WHERE e.class_uuid = ?1
               AND u.course_uuid = ?2;",
            params![class_id.to_string(), course_id.to_string()],
            |row| row.get(0),
        )?;
        parse_count(count, "enrollments.count")
    }

    fn list_enrolled_student_ids(&self, class_id: MatrixClassId) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_uuid
             FROM enrollments
             WHERE class_uuid = ?1
             ORDER BY enrolled_at ASC, student_uuid ASC;",
        )?;
        let mut rows = stmt.query([class_id.to_string()])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            students.push(parse_uuid(&value, "enrollments.student_uuid")?);
        }
        Ok(students)
    }
}

fn parse_enrollment_row(row: &Row<'_>) -> RepoResult<Enrollment> {
    let id_text: String = row.get("uuid")?;
    let class_text: String = row.get("class_uuid")?;
    let student_text: String = row.get("student_uuid")?;
    Ok(Enrollment {
        id: parse_uuid(&id_text, "enrollments.uuid")?,
        class_id: parse_uuid(&class_text, "enrollments.class_uuid")?,
        student_id: parse_uuid(&student_text, "enrollments.student_uuid")?,
        enrolled_at: row.get("enrolled_at")?,
    })
}
