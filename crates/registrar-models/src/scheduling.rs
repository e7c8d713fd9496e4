//! Timetable rules: slot overlap, lesson conflicts and weekly expansion.
//!
//! Slots are half-open `[start, end)` intervals on a weekday, so a lesson
//! ending at 10:00 and another starting at 10:00 do not collide.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;

use crate::ids::{LessonId, SubjectOfferingId, TeacherId};
use crate::lessons::{LessonOccurrence, ScheduledLesson, Weekday};

/// Longest range `/api/lessons/schedule` expands, inclusive of both ends.
pub const MAX_SCHEDULE_DAYS: i64 = 62;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSlot;

impl fmt::Display for InvalidSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("start_time must be before end_time")
    }
}

impl std::error::Error for InvalidSlot {}

impl TimeSlot {
    /// Builds a slot, refusing empty or inverted intervals.
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, InvalidSlot> {
        if start < end {
            Ok(Self { day, start, end })
        } else {
            Err(InvalidSlot)
        }
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        overlaps(self, other)
    }
}

pub fn overlaps(a: &TimeSlot, b: &TimeSlot) -> bool {
    a.day == b.day && a.start < b.end && a.end > b.start
}

/// An already scheduled lesson as seen by the conflict check.
#[derive(Debug, Clone, FromRow)]
pub struct BookedLesson {
    pub id: LessonId,
    pub subject_offering_id: SubjectOfferingId,
    pub teacher_id: TeacherId,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl BookedLesson {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot {
            day: self.day,
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Another lesson of the same subject offering
    SubjectOffering,
    /// A lesson of a different offering taught by the same teacher
    Teacher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub lesson_id: LessonId,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::SubjectOffering => write!(
                f,
                "Lesson overlaps lesson {} of the same subject offering",
                self.lesson_id
            ),
            ConflictKind::Teacher => write!(
                f,
                "Teacher already has lesson {} at an overlapping time",
                self.lesson_id
            ),
        }
    }
}

/// Returns the first booked lesson that collides with `candidate`.
///
/// A booked lesson collides when its slot overlaps and it either belongs to
/// `offering_id` or is taught by `teacher_id`. Callers exclude the lesson
/// being updated from `existing`.
pub fn find_conflict(
    candidate: &TimeSlot,
    offering_id: SubjectOfferingId,
    teacher_id: TeacherId,
    existing: &[BookedLesson],
) -> Option<Conflict> {
    existing.iter().find_map(|booked| {
        if !candidate.overlaps(&booked.slot()) {
            return None;
        }
        let kind = if booked.subject_offering_id == offering_id {
            ConflictKind::SubjectOffering
        } else if booked.teacher_id == teacher_id {
            ConflictKind::Teacher
        } else {
            return None;
        };
        Some(Conflict {
            lesson_id: booked.id,
            kind,
        })
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRangeError {
    Inverted,
    TooLong,
}

impl fmt::Display for ScheduleRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleRangeError::Inverted => f.write_str("'from' must not be after 'to'"),
            ScheduleRangeError::TooLong => write!(
                f,
                "Schedule range cannot exceed {} days",
                MAX_SCHEDULE_DAYS
            ),
        }
    }
}

impl std::error::Error for ScheduleRangeError {}

pub fn check_schedule_range(from: NaiveDate, to: NaiveDate) -> Result<(), ScheduleRangeError> {
    if from > to {
        return Err(ScheduleRangeError::Inverted);
    }
    if (to - from).num_days() + 1 > MAX_SCHEDULE_DAYS {
        return Err(ScheduleRangeError::TooLong);
    }
    Ok(())
}

/// Expands weekly lessons into dated occurrences within `[from, to]`.
///
/// Each lesson only occurs inside its semester. Output is ordered by date,
/// then start time.
pub fn expand_occurrences(
    lessons: &[ScheduledLesson],
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<LessonOccurrence>, ScheduleRangeError> {
    check_schedule_range(from, to)?;

    let mut occurrences = Vec::new();
    let mut next = Some(from);
    while let Some(date) = next.filter(|date| *date <= to) {
        let day = Weekday::from(date.weekday());
        for lesson in lessons {
            if lesson.day != day || date < lesson.semester_start || date > lesson.semester_end {
                continue;
            }
            occurrences.push(LessonOccurrence {
                lesson_id: lesson.id,
                subject_offering_id: lesson.subject_offering_id,
                teacher_id: lesson.teacher_id,
                name: lesson.name.clone(),
                date,
                day,
                start_time: lesson.start_time,
                end_time: lesson.end_time,
                room: lesson.room.clone(),
            });
        }
        next = date.succ_opt();
    }

    occurrences.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SemesterId;
    use chrono::Duration;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn slot(day: Weekday, start: NaiveTime, end: NaiveTime) -> TimeSlot {
        TimeSlot::new(day, start, end).unwrap()
    }

    fn booked(
        offering: SubjectOfferingId,
        teacher: TeacherId,
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> BookedLesson {
        BookedLesson {
            id: LessonId::new(),
            subject_offering_id: offering,
            teacher_id: teacher,
            day,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_slot_rejects_empty_and_inverted() {
        assert_eq!(
            TimeSlot::new(Weekday::Monday, t(9, 0), t(9, 0)),
            Err(InvalidSlot)
        );
        assert_eq!(
            TimeSlot::new(Weekday::Monday, t(10, 0), t(9, 0)),
            Err(InvalidSlot)
        );
    }

    #[test]
    fn test_touching_slots_do_not_overlap() {
        let a = slot(Weekday::Monday, t(9, 0), t(10, 0));
        let b = slot(Weekday::Monday, t(10, 0), t(11, 0));
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn test_partial_and_contained_overlap() {
        let a = slot(Weekday::Tuesday, t(9, 0), t(10, 30));
        let b = slot(Weekday::Tuesday, t(10, 0), t(11, 0));
        let inner = slot(Weekday::Tuesday, t(9, 15), t(9, 45));
        assert!(overlaps(&a, &b));
        assert!(overlaps(&a, &inner));
        assert!(overlaps(&inner, &a));
    }

    #[test]
    fn test_different_days_never_overlap() {
        let a = slot(Weekday::Monday, t(9, 0), t(10, 0));
        let b = slot(Weekday::Tuesday, t(9, 0), t(10, 0));
        assert!(!overlaps(&a, &b));
    }

    #[test]
    fn test_conflict_with_same_offering() {
        let offering = SubjectOfferingId::new();
        let teacher = TeacherId::new();
        let existing = vec![booked(offering, TeacherId::new(), Weekday::Monday, t(9, 0), t(10, 0))];

        let conflict = find_conflict(
            &slot(Weekday::Monday, t(9, 30), t(10, 30)),
            offering,
            teacher,
            &existing,
        )
        .unwrap();
        assert_eq!(conflict.kind, ConflictKind::SubjectOffering);
        assert_eq!(conflict.lesson_id, existing[0].id);
    }

    #[test]
    fn test_conflict_with_same_teacher_other_offering() {
        let teacher = TeacherId::new();
        let existing = vec![booked(
            SubjectOfferingId::new(),
            teacher,
            Weekday::Friday,
            t(14, 0),
            t(15, 0),
        )];

        let conflict = find_conflict(
            &slot(Weekday::Friday, t(13, 0), t(14, 30)),
            SubjectOfferingId::new(),
            teacher,
            &existing,
        )
        .unwrap();
        assert_eq!(conflict.kind, ConflictKind::Teacher);
    }

    #[test]
    fn test_unrelated_overlap_is_allowed() {
        let existing = vec![booked(
            SubjectOfferingId::new(),
            TeacherId::new(),
            Weekday::Monday,
            t(9, 0),
            t(10, 0),
        )];
        assert!(
            find_conflict(
                &slot(Weekday::Monday, t(9, 0), t(10, 0)),
                SubjectOfferingId::new(),
                TeacherId::new(),
                &existing,
            )
            .is_none()
        );
    }

    #[test]
    fn test_first_colliding_lesson_is_reported() {
        let offering = SubjectOfferingId::new();
        let teacher = TeacherId::new();
        let existing = vec![
            booked(offering, teacher, Weekday::Monday, t(8, 0), t(9, 0)),
            booked(SubjectOfferingId::new(), teacher, Weekday::Monday, t(9, 0), t(10, 0)),
            booked(offering, teacher, Weekday::Monday, t(9, 30), t(11, 0)),
        ];
        let conflict = find_conflict(
            &slot(Weekday::Monday, t(9, 15), t(9, 45)),
            offering,
            teacher,
            &existing,
        )
        .unwrap();
        assert_eq!(conflict.lesson_id, existing[1].id);
        assert_eq!(conflict.kind, ConflictKind::Teacher);
    }

    fn scheduled(
        day: Weekday,
        start: NaiveTime,
        sem_start: NaiveDate,
        sem_end: NaiveDate,
    ) -> ScheduledLesson {
        ScheduledLesson {
            id: LessonId::new(),
            subject_offering_id: SubjectOfferingId::new(),
            teacher_id: TeacherId::new(),
            semester_id: SemesterId::new(),
            name: format!("{} lesson", day),
            day,
            start_time: start,
            end_time: start + Duration::hours(1),
            room: None,
            semester_start: sem_start,
            semester_end: sem_end,
        }
    }

    #[test]
    fn test_expand_weekly_lesson_over_two_weeks() {
        // 2025-09-01 is a Monday
        let lessons = vec![scheduled(Weekday::Wednesday, t(9, 0), d(2025, 9, 1), d(2026, 1, 31))];
        let occ = expand_occurrences(&lessons, d(2025, 9, 1), d(2025, 9, 14)).unwrap();
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2025, 9, 3), d(2025, 9, 10)]);
        assert!(occ.iter().all(|o| o.day == Weekday::Wednesday));
    }

    #[test]
    fn test_expand_respects_semester_bounds() {
        let lessons = vec![scheduled(Weekday::Monday, t(9, 0), d(2025, 9, 8), d(2025, 9, 15))];
        let occ = expand_occurrences(&lessons, d(2025, 9, 1), d(2025, 9, 30)).unwrap();
        let dates: Vec<_> = occ.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2025, 9, 8), d(2025, 9, 15)]);
    }

    #[test]
    fn test_expand_orders_by_date_then_start() {
        let lessons = vec![
            scheduled(Weekday::Monday, t(14, 0), d(2025, 1, 1), d(2025, 12, 31)),
            scheduled(Weekday::Monday, t(8, 0), d(2025, 1, 1), d(2025, 12, 31)),
        ];
        let occ = expand_occurrences(&lessons, d(2025, 9, 1), d(2025, 9, 1)).unwrap();
        assert_eq!(occ.len(), 2);
        assert_eq!(occ[0].start_time, t(8, 0));
        assert_eq!(occ[1].start_time, t(14, 0));
    }

    #[test]
    fn test_schedule_range_limits() {
        assert_eq!(
            expand_occurrences(&[], d(2025, 9, 2), d(2025, 9, 1)),
            Err(ScheduleRangeError::Inverted)
        );
        assert!(check_schedule_range(d(2025, 1, 1), d(2025, 3, 3)).is_ok());
        assert_eq!(
            check_schedule_range(d(2025, 1, 1), d(2025, 3, 4)),
            Err(ScheduleRangeError::TooLong)
        );
    }

    #[test]
    fn test_expansion_stops_at_last_representable_date() {
        let last = NaiveDate::MAX;
        let first = last - Duration::days(6);
        let lessons: Vec<_> = [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ]
        .into_iter()
        .map(|day| scheduled(day, t(9, 0), first, last))
        .collect();

        let occ = expand_occurrences(&lessons, first, last).unwrap();
        assert_eq!(occ.len(), 7);
        assert_eq!(occ.last().map(|o| o.date), Some(last));
    }
}
