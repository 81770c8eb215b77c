mod common;

use common::{add_class, add_slot, add_student, add_subject, seed_world};
use enrollment_core::db::open_db_in_memory;
use enrollment_core::{
    overlaps, ConflictKind, CreateClassRequest, EnrollmentService, MatrixClassService,
    MatrixService, ServiceError, Weekday,
};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

fn conflict_kind(err: ServiceError) -> ConflictKind {
    match err {
        ServiceError::Conflict(conflict) => conflict.kind(),
        other => panic!("expected conflict, got {other}"),
    }
}

#[test]
fn enroll_takes_a_seat_and_shows_in_student_views() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let algorithms = add_subject(&conn, "Algorithms");
    let slot = add_slot(&conn, Weekday::Monday, (8, 0), (10, 0));
    let class = add_class(&conn, &world, algorithms, &slot, 3, &[world.computer_science]);
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    let before = service.list_available(&ana, None, None).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].available_seats, 3);

    let enrollment = service.enroll(class.id, &ana).unwrap();
    assert_eq!(enrollment.class_id, class.id);
    assert_eq!(enrollment.student_id, ana.id);

    let enrolled = service.list_enrolled(&ana).unwrap();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].enrollment.id, enrollment.id);
    assert_eq!(enrolled[0].class.id, class.id);

    // Already enrolled, so the class drops out of the candidate list.
    assert!(service.list_available(&ana, None, None).unwrap().is_empty());

    let bruno = add_student(&conn, "bruno@uni.example", Some(world.computer_science));
    let for_bruno = service.list_available(&bruno, None, None).unwrap();
    assert_eq!(for_bruno[0].available_seats, 2);
}

#[test]
fn unknown_class_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));

    let err = EnrollmentService::new(&conn)
        .enroll(Uuid::new_v4(), &ana)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "class", .. }));
}

#[test]
fn course_outside_authorized_set_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let subject = add_subject(&conn, "Databases");
    let slot = add_slot(&conn, Weekday::Tuesday, (14, 0), (16, 0));
    let class = add_class(&conn, &world, subject, &slot, 10, &[world.computer_science]);
    let service = EnrollmentService::new(&conn);

    let outsider = add_student(&conn, "iris@uni.example", Some(world.information_systems));
    let err = service.enroll(class.id, &outsider).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::UnauthorizedCourse);

    let undeclared = add_student(&conn, "noah@uni.example", None);
    let err = service.enroll(class.id, &undeclared).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::UnauthorizedCourse);

    assert!(service.list_enrolled(&outsider).unwrap().is_empty());
}

#[test]
fn second_attempt_on_same_class_is_already_enrolled() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let subject = add_subject(&conn, "Compilers");
    let slot = add_slot(&conn, Weekday::Wednesday, (8, 0), (10, 0));
    let class = add_class(&conn, &world, subject, &slot, 5, &[world.computer_science]);
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    service.enroll(class.id, &ana).unwrap();
    let err = service.enroll(class.id, &ana).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::AlreadyEnrolled);
}

#[test]
fn full_class_reports_no_seats() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let subject = add_subject(&conn, "Networks");
    let slot = add_slot(&conn, Weekday::Thursday, (19, 0), (21, 0));
    let class = add_class(&conn, &world, subject, &slot, 1, &[world.computer_science]);
    let service = EnrollmentService::new(&conn);

    let first = add_student(&conn, "first@uni.example", Some(world.computer_science));
    let second = add_student(&conn, "second@uni.example", Some(world.computer_science));
    service.enroll(class.id, &first).unwrap();

    let err = service.enroll(class.id, &second).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::NoSeats);
    assert!(service.list_available(&second, None, None).unwrap().is_empty());
}

#[test]
fn same_subject_in_another_slot_is_duplicate_subject() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let calculus = add_subject(&conn, "Calculus I");
    let morning = add_slot(&conn, Weekday::Monday, (8, 0), (10, 0));
    let evening = add_slot(&conn, Weekday::Friday, (19, 0), (21, 0));
    let first = add_class(&conn, &world, calculus, &morning, 10, &[world.computer_science]);
    let second = add_class(&conn, &world, calculus, &evening, 10, &[world.computer_science]);
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    service.enroll(first.id, &ana).unwrap();
    let err = service.enroll(second.id, &ana).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::DuplicateSubject);
}

#[test]
fn overlapping_slot_is_schedule_conflict_but_touching_is_fine() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let held = add_class(
        &conn,
        &world,
        add_subject(&conn, "Physics"),
        &add_slot(&conn, Weekday::Monday, (8, 0), (10, 0)),
        10,
        &[world.computer_science],
    );
    let overlapping = add_class(
        &conn,
        &world,
        add_subject(&conn, "Chemistry"),
        &add_slot(&conn, Weekday::Monday, (9, 0), (11, 0)),
        10,
        &[world.computer_science],
    );
    let touching = add_class(
        &conn,
        &world,
        add_subject(&conn, "Statistics"),
        &add_slot(&conn, Weekday::Monday, (10, 0), (12, 0)),
        10,
        &[world.computer_science],
    );
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    service.enroll(held.id, &ana).unwrap();
    let err = service.enroll(overlapping.id, &ana).unwrap_err();
    match err {
        ServiceError::Conflict(enrollment_core::Conflict::ScheduleConflict {
            conflicting_class_id,
            ..
        }) => assert_eq!(conflicting_class_id, held.id),
        other => panic!("expected schedule conflict, got {other}"),
    }
    service.enroll(touching.id, &ana).unwrap();
}

#[test]
fn classes_of_inactive_matrix_are_not_enrollable() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let matrices = MatrixService::new(&conn);
    let draft = matrices.create_matrix(&world.coordinator, "2026.2").unwrap();
    let slot = add_slot(&conn, Weekday::Tuesday, (8, 0), (10, 0));
    let draft_class = MatrixClassService::new(&conn)
        .create_class(
            &world.coordinator,
            draft.id,
            CreateClassRequest {
                subject_id: add_subject(&conn, "Ethics"),
                professor_id: world.professor,
                time_slot_id: slot.id,
                max_students: 10,
                authorized_course_ids: BTreeSet::from([world.computer_science]),
            },
        )
        .unwrap();
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    let err = service.enroll(draft_class.id, &ana).unwrap_err();
    assert_eq!(conflict_kind(err), ConflictKind::MatrixInactive);
    assert!(service
        .list_available(&ana, Some(draft.id), None)
        .unwrap()
        .is_empty());
}

#[test]
fn listing_honors_matrix_and_subject_filters() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let logic = add_subject(&conn, "Logic");
    let art = add_subject(&conn, "Art History");
    add_class(
        &conn,
        &world,
        logic,
        &add_slot(&conn, Weekday::Monday, (8, 0), (10, 0)),
        10,
        &[world.computer_science],
    );
    add_class(
        &conn,
        &world,
        art,
        &add_slot(&conn, Weekday::Tuesday, (8, 0), (10, 0)),
        10,
        &[world.computer_science],
    );
    let ana = add_student(&conn, "ana@uni.example", Some(world.computer_science));
    let service = EnrollmentService::new(&conn);

    assert_eq!(service.list_available(&ana, None, None).unwrap().len(), 2);
    assert_eq!(
        service
            .list_available(&ana, Some(world.matrix.id), None)
            .unwrap()
            .len(),
        2
    );
    let only_logic = service.list_available(&ana, None, Some(logic)).unwrap();
    assert_eq!(only_logic.len(), 1);
    assert_eq!(only_logic[0].class.subject_id, logic);
    assert!(service
        .list_available(&ana, Some(Uuid::new_v4()), None)
        .unwrap()
        .is_empty());
}

#[test]
fn any_enroll_sequence_keeps_schedule_and_subjects_consistent() {
    let conn = open_db_in_memory().unwrap();
    let world = seed_world(&conn);
    let subjects: Vec<_> = (0..4)
        .map(|index| add_subject(&conn, &format!("Subject {index}")))
        .collect();
    let slots = [
        add_slot(&conn, Weekday::Monday, (8, 0), (10, 0)),
        add_slot(&conn, Weekday::Monday, (9, 30), (11, 0)),
        add_slot(&conn, Weekday::Monday, (10, 0), (12, 0)),
        add_slot(&conn, Weekday::Wednesday, (8, 0), (10, 0)),
    ];
    let mut classes = Vec::new();
    for (subject_index, subject_id) in subjects.iter().enumerate() {
        for (slot_index, slot) in slots.iter().enumerate() {
            if (subject_index + slot_index) % 2 == 0 || subject_index == 3 {
                classes.push(add_class(
                    &conn,
                    &world,
                    *subject_id,
                    slot,
                    2,
                    &[world.computer_science],
                ));
            }
        }
    }

    let service = EnrollmentService::new(&conn);
    let students: Vec<_> = (0..3)
        .map(|index| {
            add_student(
                &conn,
                &format!("student{index}@uni.example"),
                Some(world.computer_science),
            )
        })
        .collect();

    // Deterministic but scrambled attempt order.
    for step in 0..(classes.len() * students.len() * 2) {
        let class = &classes[(step * 7 + 3) % classes.len()];
        let student = &students[(step * 5 + 1) % students.len()];
        let _ = service.enroll(class.id, student);
    }

    for student in &students {
        let enrolled = service.list_enrolled(student).unwrap();
        let mut seen_subjects = HashSet::new();
        for (index, left) in enrolled.iter().enumerate() {
            assert!(seen_subjects.insert(left.class.subject_id));
            for right in &enrolled[index + 1..] {
                assert!(!overlaps(&left.class.time_slot, &right.class.time_slot));
            }
        }
    }
    for class in &classes {
        let taken: usize = students
            .iter()
            .map(|student| {
                service
                    .list_enrolled(student)
                    .unwrap()
                    .iter()
                    .filter(|entry| entry.class.id == class.id)
                    .count()
            })
            .sum();
        assert!(taken <= class.max_students as usize);
    }
}
