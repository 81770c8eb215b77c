#![allow(dead_code)]

use enrollment_core::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use enrollment_core::{
    Coordinator, Course, CourseId, CreateClassRequest, CurriculumMatrix, MatrixClass,
    MatrixClassService, MatrixService, Professor, ProfessorId, Student, Subject, SubjectId,
    TimeOfDay, TimeSlot, User, Weekday,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Seeded reference data plus one active matrix.
pub struct World {
    pub coordinator: Coordinator,
    pub matrix: CurriculumMatrix,
    pub computer_science: CourseId,
    pub information_systems: CourseId,
    pub professor: ProfessorId,
}

pub fn seed_world(conn: &Connection) -> World {
    let reference = SqliteReferenceRepository::new(conn);
    let computer_science = reference
        .create_course(&Course::new("Computer Science"))
        .unwrap();
    let information_systems = reference
        .create_course(&Course::new("Information Systems"))
        .unwrap();
    let professor = reference
        .create_professor(&Professor::new("Dr. Helena Costa"))
        .unwrap();

    let coordinator = add_coordinator(conn, "coordinator@uni.example");
    let matrices = MatrixService::new(conn);
    let matrix = matrices.create_matrix(&coordinator, "2026.1").unwrap();
    let matrix = matrices.activate(matrix.id, &coordinator).unwrap();

    World {
        coordinator,
        matrix,
        computer_science,
        information_systems,
        professor,
    }
}

pub fn add_coordinator(conn: &Connection, email: &str) -> Coordinator {
    let user = User::coordinator(email, "Coordinator");
    SqliteReferenceRepository::new(conn)
        .create_user(&user)
        .unwrap();
    user.as_coordinator().unwrap()
}

pub fn add_student(conn: &Connection, email: &str, course: Option<CourseId>) -> Student {
    let user = User::student(email, "Student", course);
    SqliteReferenceRepository::new(conn)
        .create_user(&user)
        .unwrap();
    user.as_student().unwrap()
}

pub fn add_subject(conn: &Connection, name: &str) -> SubjectId {
    SqliteReferenceRepository::new(conn)
        .create_subject(&Subject::new(name))
        .unwrap()
}

pub fn add_slot(conn: &Connection, day: Weekday, start: (u16, u16), end: (u16, u16)) -> TimeSlot {
    let slot = TimeSlot::new(
        day,
        TimeOfDay::hm(start.0, start.1).unwrap(),
        TimeOfDay::hm(end.0, end.1).unwrap(),
    )
    .unwrap();
    SqliteReferenceRepository::new(conn)
        .create_time_slot(&slot)
        .unwrap();
    slot
}

pub fn add_class(
    conn: &Connection,
    world: &World,
    subject_id: SubjectId,
    slot: &TimeSlot,
    max_students: u32,
    courses: &[CourseId],
) -> MatrixClass {
    MatrixClassService::new(conn)
        .create_class(
            &world.coordinator,
            world.matrix.id,
            CreateClassRequest {
                subject_id,
                professor_id: world.professor,
                time_slot_id: slot.id,
                max_students,
                authorized_course_ids: courses.iter().copied().collect::<BTreeSet<_>>(),
            },
        )
        .unwrap()
}
