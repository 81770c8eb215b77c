//! Reference data repository: courses, subjects, professors, time slots, users.
//!
//! # Responsibility
//! - Provide create/lookup/list for data the enrollment core reads but never
//!   mutates during an enrollment or guard call.
//!
//! # Invariants
//! - Time slots and users are validated before insertion.
//! - User email lookup is case-insensitive.

use crate::model::reference::{Course, CourseId, Professor, ProfessorId, Subject, SubjectId};
use crate::model::time_slot::{TimeOfDay, TimeSlot, TimeSlotId, Weekday};
use crate::model::user::{User, UserId, UserRole};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const TIME_SLOT_SELECT_SQL: &str = "SELECT
    uuid,
    day_of_week,
    start_minute,
    end_minute,
    code
FROM time_slots";

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    email,
    name,
    role,
    course_uuid
FROM users";

/// Repository interface for reference data lookups.
pub trait ReferenceRepository {
    fn create_course(&self, course: &Course) -> RepoResult<CourseId>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn list_courses(&self) -> RepoResult<Vec<Course>>;
    fn create_subject(&self, subject: &Subject) -> RepoResult<SubjectId>;
    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>>;
    fn list_subjects(&self) -> RepoResult<Vec<Subject>>;
    fn create_professor(&self, professor: &Professor) -> RepoResult<ProfessorId>;
    fn get_professor(&self, id: ProfessorId) -> RepoResult<Option<Professor>>;
    fn list_professors(&self) -> RepoResult<Vec<Professor>>;
    fn create_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlotId>;
    fn get_time_slot(&self, id: TimeSlotId) -> RepoResult<Option<TimeSlot>>;
    /// Ordered by day, then start time.
    fn list_time_slots(&self) -> RepoResult<Vec<TimeSlot>>;
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed reference data repository.
pub struct SqliteReferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<CourseId> {
        insert_named(self.conn, "courses", course.id, &course.name)?;
        Ok(course.id)
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        Ok(get_named(self.conn, "courses", id)?.map(|(id, name)| Course { id, name }))
    }

    fn list_courses(&self) -> RepoResult<Vec<Course>> {
        Ok(list_named(self.conn, "courses")?
            .into_iter()
            .map(|(id, name)| Course { id, name })
            .collect())
    }

    fn create_subject(&self, subject: &Subject) -> RepoResult<SubjectId> {
        insert_named(self.conn, "subjects", subject.id, &subject.name)?;
        Ok(subject.id)
    }

    fn get_subject(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        Ok(get_named(self.conn, "subjects", id)?.map(|(id, name)| Subject { id, name }))
    }

    fn list_subjects(&self) -> RepoResult<Vec<Subject>> {
        Ok(list_named(self.conn, "subjects")?
            .into_iter()
            .map(|(id, name)| Subject { id, name })
            .collect())
    }

    fn create_professor(&self, professor: &Professor) -> RepoResult<ProfessorId> {
        insert_named(self.conn, "professors", professor.id, &professor.name)?;
        Ok(professor.id)
    }

    fn get_professor(&self, id: ProfessorId) -> RepoResult<Option<Professor>> {
        Ok(get_named(self.conn, "professors", id)?.map(|(id, name)| Professor { id, name }))
    }

    fn list_professors(&self) -> RepoResult<Vec<Professor>> {
        Ok(list_named(self.conn, "professors")?
            .into_iter()
            .map(|(id, name)| Professor { id, name })
            .collect())
    }

    fn create_time_slot(&self, slot: &TimeSlot) -> RepoResult<TimeSlotId> {
        slot.validate()?;

        self.conn.execute(
            "INSERT INTO time_slots (
                uuid,
                day_of_week,
                start_minute,
                end_minute,
                code
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                slot.id.to_string(),
                slot.day.as_str(),
                slot.start.minutes(),
                slot.end.minutes(),
                slot.code.as_deref(),
            ],
        )?;
        Ok(slot.id)
    }

    fn get_time_slot(&self, id: TimeSlotId) -> RepoResult<Option<TimeSlot>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TIME_SLOT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_time_slot_row(row, "")?));
        }
        Ok(None)
    }

    fn list_time_slots(&self) -> RepoResult<Vec<TimeSlot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TIME_SLOT_SELECT_SQL}
             ORDER BY
                CASE day_of_week
                    WHEN 'monday' THEN 1
                    WHEN 'tuesday' THEN 2
                    WHEN 'wednesday' THEN 3
                    WHEN 'thursday' THEN 4
                    WHEN 'friday' THEN 5
                    WHEN 'saturday' THEN 6
                    ELSE 7
                END ASC,
                start_minute ASC,
                uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut slots = Vec::new();
        while let Some(row) = rows.next()? {
            slots.push(parse_time_slot_row(row, "")?);
        }
        Ok(slots)
    }

    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (
                uuid,
                email,
                name,
                role,
                course_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                user.id.to_string(),
                user.email.trim(),
                user.name.as_str(),
                user.role.as_str(),
                user.course_id.map(|value| value.to_string()),
            ],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([email.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }
}

/// Parses time slot columns, optionally prefixed (e.g. `ts_`) when joined.
pub(crate) fn parse_time_slot_row(row: &Row<'_>, prefix: &str) -> RepoResult<TimeSlot> {
    let id_text: String = row.get(format!("{prefix}uuid").as_str())?;
    let id = parse_uuid(&id_text, "time_slots.uuid")?;

    let day_text: String = row.get(format!("{prefix}day_of_week").as_str())?;
    let day = Weekday::parse(&day_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid day `{day_text}` in time_slots.day_of_week"
        ))
    })?;

    let start = parse_time_of_day(
        row.get(format!("{prefix}start_minute").as_str())?,
        "time_slots.start_minute",
    )?;
    let end = parse_time_of_day(
        row.get(format!("{prefix}end_minute").as_str())?,
        "time_slots.end_minute",
    )?;

    let slot = TimeSlot {
        id,
        day,
        start,
        end,
        code: row.get(format!("{prefix}code").as_str())?,
    };
    slot.validate()?;
    Ok(slot)
}

fn parse_time_of_day(value: i64, column: &'static str) -> RepoResult<TimeOfDay> {
    u16::try_from(value)
        .ok()
        .and_then(TimeOfDay::from_minutes)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid minute `{value}` in {column}")))
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("uuid")?;
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;
    let course_id = row
        .get::<_, Option<String>>("course_uuid")?
        .map(|value| parse_uuid(&value, "users.course_uuid"))
        .transpose()?;

    Ok(User {
        id: parse_uuid(&id_text, "users.uuid")?,
        email: row.get("email")?,
        name: row.get("name")?,
        role,
        course_id,
    })
}

fn insert_named(
    conn: &Connection,
    table: &'static str,
    id: uuid::Uuid,
    name: &str,
) -> RepoResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidData(format!(
            "{table}.name must not be blank"
        )));
    }
    conn.execute(
        &format!("INSERT INTO {table} (uuid, name) VALUES (?1, ?2);"),
        params![id.to_string(), trimmed],
    )?;
    Ok(())
}

fn get_named(
    conn: &Connection,
    table: &'static str,
    id: uuid::Uuid,
) -> RepoResult<Option<(uuid::Uuid, String)>> {
    let name: Option<String> = conn
        .query_row(
            &format!("SELECT name FROM {table} WHERE uuid = ?1;"),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name.map(|name| (id, name)))
}

fn list_named(conn: &Connection, table: &'static str) -> RepoResult<Vec<(uuid::Uuid, String)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT uuid, name FROM {table} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        items.push((parse_uuid(&id_text, "reference.uuid")?, row.get(1)?));
    }
    Ok(items)
}
