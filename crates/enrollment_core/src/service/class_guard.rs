//! Guards that keep enrolled students valid while a class is edited or removed.
//!
//! # Responsibility
//! - Reject authorization narrowing that strands enrolled students.
//! - Reject slot changes that overlap an enrolled student's other classes.
//! - Reject deletion of classes that still have enrollments.
//!
//! # Invariants
//! - Guards are pure; callers load the inputs inside the mutation's
//!   transaction so the decision and the write see the same state.

use crate::model::matrix::{MatrixClass, MatrixClassId};
use crate::model::reference::CourseId;
use crate::model::time_slot::{overlaps, TimeSlot};
use crate::model::user::UserId;
use crate::service::conflict::Conflict;
use std::collections::BTreeSet;

/// Courses present in `current` but missing from `proposed`, in id order.
pub fn removed_courses(
    current: &BTreeSet<CourseId>,
    proposed: &BTreeSet<CourseId>,
) -> Vec<CourseId> {
    current.difference(proposed).copied().collect()
}

/// Fails when a removed course still has enrolled students.
///
/// `enrolled_in(course)` returns how many of the class's students belong to
/// `course`; it is only called for removed courses.
pub fn guard_authorization_narrowing<F, E>(
    class_id: MatrixClassId,
    current: &BTreeSet<CourseId>,
    proposed: &BTreeSet<CourseId>,
    mut enrolled_in: F,
) -> Result<Result<(), Conflict>, E>
where
    F: FnMut(CourseId) -> Result<u32, E>,
{
    let mut stranded = Vec::new();
    for course_id in removed_courses(current, proposed) {
        if enrolled_in(course_id)? > 0 {
            stranded.push(course_id);
        }
    }
    if stranded.is_empty() {
        return Ok(Ok(()));
    }
    Ok(Err(Conflict::InvalidateEnrollments {
        class_id,
        course_ids: stranded,
    }))
}

/// One enrolled student and the other visible classes they hold.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub student_id: UserId,
    pub classes: Vec<MatrixClass>,
}

/// Fails on the first student whose other classes overlap `new_slot`.
pub fn guard_schedule_change(
    class_id: MatrixClassId,
    new_slot: &TimeSlot,
    roster: &[RosterEntry],
) -> Result<(), Conflict> {
    for entry in roster {
        let clash = entry
            .classes
            .iter()
            .find(|held| held.id != class_id && overlaps(&held.time_slot, new_slot));
        if let Some(held) = clash {
            return Err(Conflict::ScheduleConflict {
                student_id: entry.student_id,
                class_id,
                conflicting_class_id: held.id,
            });
        }
    }
    Ok(())
}

pub fn guard_deletion(class_id: MatrixClassId, enrollment_count: u32) -> Result<(), Conflict> {
    if enrollment_count > 0 {
        return Err(Conflict::HasEnrollments {
            class_id,
            enrollment_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        guard_authorization_narrowing, guard_deletion, guard_schedule_change, removed_courses,
        RosterEntry,
    };
    use crate::model::matrix::MatrixClass;
    use crate::model::time_slot::{TimeOfDay, TimeSlot, Weekday};
    use crate::service::conflict::{Conflict, ConflictKind};
    use std::collections::{BTreeSet, HashMap};
    use std::convert::Infallible;
    use uuid::Uuid;

    fn slot(day: Weekday, start_h: u16, end_h: u16) -> TimeSlot {
        TimeSlot::new(
            day,
            TimeOfDay::hm(start_h, 0).expect("start"),
            TimeOfDay::hm(end_h, 0).expect("end"),
        )
        .expect("valid slot")
    }

    fn class_at(time_slot: TimeSlot) -> MatrixClass {
        MatrixClass {
            id: Uuid::new_v4(),
            matrix_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            professor_id: Uuid::new_v4(),
            time_slot,
            max_students: 10,
            authorized_course_ids: BTreeSet::from([Uuid::new_v4()]),
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn removed_courses_is_set_difference() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let removed = removed_courses(&BTreeSet::from([a, b]), &BTreeSet::from([b, c]));
        assert_eq!(removed, vec![a]);
    }

    #[test]
    fn narrowing_away_unused_course_is_accepted() {
        let cs = Uuid::new_v4();
        let is = Uuid::new_v4();
        let counts = HashMap::from([(cs, 3u32), (is, 0u32)]);
        let outcome = guard_authorization_narrowing::<_, Infallible>(
            Uuid::new_v4(),
            &BTreeSet::from([cs, is]),
            &BTreeSet::from([cs]),
            |course| Ok(counts[&course]),
        )
        .expect("lookup");
        assert!(outcome.is_ok());
    }

    #[test]
    fn narrowing_away_used_course_names_it() {
        let class_id = Uuid::new_v4();
        let cs = Uuid::new_v4();
        let is = Uuid::new_v4();
        let outcome = guard_authorization_narrowing::<_, Infallible>(
            class_id,
            &BTreeSet::from([cs, is]),
            &BTreeSet::from([is]),
            |_| Ok(1),
        )
        .expect("lookup");
        assert_eq!(
            outcome,
            Err(Conflict::InvalidateEnrollments {
                class_id,
                course_ids: vec![cs]
            })
        );
    }

    #[test]
    fn lookup_failure_propagates() {
        let cs = Uuid::new_v4();
        let outcome = guard_authorization_narrowing(
            Uuid::new_v4(),
            &BTreeSet::from([cs]),
            &BTreeSet::new(),
            |_| Err("db down"),
        );
        assert_eq!(outcome, Err("db down"));
    }

    #[test]
    fn slot_change_into_held_class_is_rejected() {
        let moving = class_at(slot(Weekday::Monday, 8, 10));
        let held = class_at(slot(Weekday::Tuesday, 8, 10));
        let student_id = Uuid::new_v4();
        let roster = vec![RosterEntry {
            student_id,
            classes: vec![moving.clone(), held.clone()],
        }];

        let err = guard_schedule_change(moving.id, &slot(Weekday::Tuesday, 9, 11), &roster)
            .expect_err("overlap");
        assert_eq!(
            err,
            Conflict::ScheduleConflict {
                student_id,
                class_id: moving.id,
                conflicting_class_id: held.id
            }
        );
    }

    #[test]
    fn class_never_conflicts_with_itself() {
        let moving = class_at(slot(Weekday::Monday, 8, 10));
        let roster = vec![RosterEntry {
            student_id: Uuid::new_v4(),
            classes: vec![moving.clone()],
        }];
        assert!(guard_schedule_change(moving.id, &slot(Weekday::Monday, 9, 11), &roster).is_ok());
    }

    #[test]
    fn deletion_requires_empty_class() {
        let class_id = Uuid::new_v4();
        assert!(guard_deletion(class_id, 0).is_ok());
        let err = guard_deletion(class_id, 2).expect_err("has enrollments");
        assert_eq!(err.kind(), ConflictKind::HasEnrollments);
    }
}
