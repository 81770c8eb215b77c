//! Weekly time slots and schedule overlap detection.
//!
//! # Responsibility
//! - Define the recurring day + time-of-day interval classes are held in.
//! - Decide whether two slots collide (`overlaps`).
//! - Bucket slots into periods of the day for coordinator filtering.
//!
//! # Invariants
//! - Slot intervals are half-open: `[start, end)`, with `start < end`.
//! - Slots on different days never overlap.
//! - Touching slots (`a.end == b.start`) do not overlap.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TimeSlotId = Uuid;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Day label a weekly slot recurs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" => Some(Self::Monday),
            "tuesday" => Some(Self::Tuesday),
            "wednesday" => Some(Self::Wednesday),
            "thursday" => Some(Self::Thursday),
            "friday" => Some(Self::Friday),
            "saturday" => Some(Self::Saturday),
            "sunday" => Some(Self::Sunday),
            _ => None,
        }
    }
}

/// Minutes since midnight. `24:00` is representable as an end bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Builds a time from hour and minute; `None` when out of range.
    pub fn hm(hour: u16, minute: u16) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour.checked_mul(60)?.checked_add(minute)?)
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Validation errors for slot construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSlotValidationError {
    /// `start` is not strictly before `end`.
    EmptyInterval { start: TimeOfDay, end: TimeOfDay },
}

impl Display for TimeSlotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInterval { start, end } => {
                write!(f, "time slot start {start} must be before end {end}")
            }
        }
    }
}

impl Error for TimeSlotValidationError {}

/// Weekly recurring interval a class is scheduled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub day: Weekday,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// Short institutional code such as `M24AB`, when assigned.
    pub code: Option<String>,
}

impl TimeSlot {
    /// Creates a validated slot with a generated id.
    pub fn new(
        day: Weekday,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Self, TimeSlotValidationError> {
        let slot = Self {
            id: Uuid::new_v4(),
            day,
            start,
            end,
            code: None,
        };
        slot.validate()?;
        Ok(slot)
    }

    pub fn validate(&self) -> Result<(), TimeSlotValidationError> {
        if self.start >= self.end {
            return Err(TimeSlotValidationError::EmptyInterval {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// See [`overlaps`].
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(self, other)
    }
}

/// Returns whether two weekly slots share any instant.
pub fn overlaps(a: &TimeSlot, b: &TimeSlot) -> bool {
    a.day == b.day && a.start < b.end && b.start < a.end
}

/// Coarse part of the day a slot starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodOfDay {
    /// `[06:00, 12:00)`
    Morning,
    /// `[12:00, 18:00)`
    Afternoon,
    /// `[18:00, 24:00]`
    Evening,
}

impl PeriodOfDay {
    /// Whether `time` falls in this period.
    pub fn contains(self, time: TimeOfDay) -> bool {
        let minutes = time.minutes();
        match self {
            Self::Morning => (6 * 60..12 * 60).contains(&minutes),
            Self::Afternoon => (12 * 60..18 * 60).contains(&minutes),
            Self::Evening => minutes >= 18 * 60,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "afternoon" => Some(Self::Afternoon),
            "evening" => Some(Self::Evening),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{overlaps, PeriodOfDay, TimeOfDay, TimeSlot, TimeSlotValidationError, Weekday};

    fn t(hour: u16, minute: u16) -> TimeOfDay {
        TimeOfDay::hm(hour, minute).expect("valid time")
    }

    fn slot(day: Weekday, start: TimeOfDay, end: TimeOfDay) -> TimeSlot {
        TimeSlot::new(day, start, end).expect("valid slot")
    }

    #[test]
    fn same_day_intersecting_slots_overlap() {
        let a = slot(Weekday::Monday, t(8, 0), t(10, 0));
        let b = slot(Weekday::Monday, t(9, 30), t(11, 0));
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn contained_slot_overlaps() {
        let outer = slot(Weekday::Friday, t(7, 0), t(12, 0));
        let inner = slot(Weekday::Friday, t(8, 0), t(9, 0));
        assert!(overlaps(&outer, &inner));
        assert!(overlaps(&inner, &outer));
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        let a = slot(Weekday::Tuesday, t(8, 0), t(10, 0));
        let b = slot(Weekday::Tuesday, t(10, 0), t(12, 0));
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn different_days_never_overlap() {
        let days = [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ];
        for (i, day_a) in days.iter().enumerate() {
            for day_b in days.iter().skip(i + 1) {
                for start in (0..23).step_by(3) {
                    let a = slot(*day_a, t(start, 0), t(start + 1, 30));
                    let b = slot(*day_b, t(start, 0), t(start + 1, 30));
                    assert!(!overlaps(&a, &b), "{day_a:?} vs {day_b:?} at {start}");
                }
            }
        }
    }

    #[test]
    fn overlap_is_symmetric_over_grid() {
        let bounds: Vec<u16> = (0..=8).map(|i| 8 * 60 + i * 30).collect();
        let mut slots = Vec::new();
        for (i, start) in bounds.iter().enumerate() {
            for end in bounds.iter().skip(i + 1) {
                slots.push(TimeSlot {
                    id: uuid::Uuid::new_v4(),
                    day: Weekday::Wednesday,
                    start: TimeOfDay::from_minutes(*start).expect("in range"),
                    end: TimeOfDay::from_minutes(*end).expect("in range"),
                    code: None,
                });
            }
        }
        for a in &slots {
            for b in &slots {
                assert_eq!(overlaps(a, b), overlaps(b, a));
                if a.end == b.start {
                    assert!(!overlaps(a, b));
                }
            }
            assert!(overlaps(a, a));
        }
    }

    #[test]
    fn empty_interval_is_rejected() {
        let err = TimeSlot::new(Weekday::Monday, t(10, 0), t(10, 0)).unwrap_err();
        assert!(matches!(err, TimeSlotValidationError::EmptyInterval { .. }));
    }

    #[test]
    fn time_of_day_bounds_and_display() {
        assert_eq!(t(7, 5).to_string(), "07:05");
        assert!(TimeOfDay::hm(24, 0).is_some());
        assert!(TimeOfDay::hm(24, 1).is_none());
        assert!(TimeOfDay::hm(9, 60).is_none());
    }

    #[test]
    fn period_of_day_boundaries() {
        assert!(PeriodOfDay::Morning.contains(t(6, 0)));
        assert!(!PeriodOfDay::Morning.contains(t(12, 0)));
        assert!(PeriodOfDay::Afternoon.contains(t(12, 0)));
        assert!(!PeriodOfDay::Afternoon.contains(t(18, 0)));
        assert!(PeriodOfDay::Evening.contains(t(18, 0)));
        assert!(PeriodOfDay::Evening.contains(t(23, 59)));
        assert!(!PeriodOfDay::Evening.contains(t(5, 59)));
        assert_eq!(PeriodOfDay::parse(" Evening "), Some(PeriodOfDay::Evening));
    }
}
