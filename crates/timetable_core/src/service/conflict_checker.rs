//! Teacher and classroom double-booking detection.
//!
//! # Responsibility
//! - Decide whether one resolved candidate period may be persisted.
//! - Index the periods already accepted earlier in the same submission so a
//!   batch cannot double-book against itself.
//!
//! # Invariants
//! - Detection is institution-wide and subject-independent: any period of
//!   the same teacher profile, or in the same classroom, counts.
//! - Teacher conflicts win over classroom conflicts; stored periods are
//!   reported before pending ones.
//! - Read-only. Callers hold the write transaction that makes the answer
//!   stay true until their insert.

use crate::model::directory::{ClassroomId, TeacherProfileId};
use crate::model::period::{PeriodId, PeriodRecord, ResolvedPeriod};
use crate::repo::period_repo::PeriodRepository;
use crate::repo::store::RepoResult;
use chrono::Weekday;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Which shared resource two periods collide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Same teacher profile, overlapping window.
    #[serde(rename = "TEACHER_CONFLICT")]
    Teacher,
    /// Same classroom, overlapping window.
    #[serde(rename = "CLASSROOM_CONFLICT")]
    Classroom,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Teacher => write!(f, "TEACHER_CONFLICT"),
            Self::Classroom => write!(f, "CLASSROOM_CONFLICT"),
        }
    }
}

/// The period a candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictingPeriod {
    /// A committed period, possibly in another timetable.
    Stored(PeriodRecord),
    /// An earlier member of the same submission.
    Pending {
        batch_index: usize,
        period: ResolvedPeriod,
    },
}

impl ConflictingPeriod {
    pub fn period_id(&self) -> Option<PeriodId> {
        match self {
            Self::Stored(record) => Some(record.id),
            Self::Pending { .. } => None,
        }
    }

    fn resolved(&self) -> ResolvedPeriod {
        match self {
            Self::Stored(record) => record.to_resolved(),
            Self::Pending { period, .. } => period.clone(),
        }
    }
}

/// Details of one rejected candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    /// Position of the candidate in a batch submission.
    pub candidate_index: Option<usize>,
    pub candidate: ResolvedPeriod,
    pub existing: ConflictingPeriod,
}

impl ScheduleConflict {
    /// Human-readable description naming the busy teacher or classroom and
    /// the colliding window.
    pub fn summary(&self) -> String {
        let existing = self.existing.resolved();
        match self.kind {
            ConflictKind::Teacher => format!(
                "teacher {} is already teaching {} in {} on {}",
                existing.teacher.display_name,
                existing.subject.name,
                existing.classroom.name,
                existing.slot
            ),
            ConflictKind::Classroom => format!(
                "classroom {} is already booked for {} with {} on {}",
                existing.classroom.name,
                existing.subject.name,
                existing.teacher.display_name,
                existing.slot
            ),
        }
    }
}

/// Outcome of one conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCheck {
    NoConflict,
    Conflict(Box<ScheduleConflict>),
}

impl ConflictCheck {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSpan {
    start_minute: u16,
    end_minute: u16,
    position: usize,
}

/// Periods accepted earlier in one submission, not yet persisted.
///
/// Keeps one start-sorted interval list per (teacher, day) and per
/// (classroom, day). Scoped to a single request.
#[derive(Debug, Default)]
pub struct PendingPeriods {
    accepted: Vec<(usize, ResolvedPeriod)>,
    by_teacher: HashMap<(TeacherProfileId, Weekday), Vec<PendingSpan>>,
    by_classroom: HashMap<(ClassroomId, Weekday), Vec<PendingSpan>>,
}

impl PendingPeriods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Records an accepted candidate under its submission index.
    pub fn insert(&mut self, batch_index: usize, period: ResolvedPeriod) {
        let span = PendingSpan {
            start_minute: period.slot.start_minute(),
            end_minute: period.slot.end_minute(),
            position: self.accepted.len(),
        };
        let day = period.slot.day();
        insert_sorted(
            self.by_teacher
                .entry((period.teacher.profile_id, day))
                .or_default(),
            span,
        );
        insert_sorted(
            self.by_classroom
                .entry((period.classroom.id, day))
                .or_default(),
            span,
        );
        self.accepted.push((batch_index, period));
    }

    /// Consumes the index, returning accepted periods in acceptance order.
    pub fn into_periods(self) -> Vec<ResolvedPeriod> {
        self.accepted
            .into_iter()
            .map(|(_, period)| period)
            .collect()
    }

    fn teacher_overlap(&self, candidate: &ResolvedPeriod) -> Option<&(usize, ResolvedPeriod)> {
        let spans = self
            .by_teacher
            .get(&(candidate.teacher.profile_id, candidate.slot.day()))?;
        self.first_overlap(spans, candidate)
    }

    fn classroom_overlap(&self, candidate: &ResolvedPeriod) -> Option<&(usize, ResolvedPeriod)> {
        let spans = self
            .by_classroom
            .get(&(candidate.classroom.id, candidate.slot.day()))?;
        self.first_overlap(spans, candidate)
    }

    fn first_overlap(
        &self,
        spans: &[PendingSpan],
        candidate: &ResolvedPeriod,
    ) -> Option<&(usize, ResolvedPeriod)> {
        let start = candidate.slot.start_minute();
        let end = candidate.slot.end_minute();
        // Spans starting at or after `end` cannot overlap.
        let reachable = spans.partition_point(|span| span.start_minute < end);
        spans[..reachable]
            .iter()
            .find(|span| span.end_minute > start)
            .map(|span| &self.accepted[span.position])
    }
}

fn insert_sorted(spans: &mut Vec<PendingSpan>, span: PendingSpan) {
    let at = spans.partition_point(|existing| existing.start_minute <= span.start_minute);
    spans.insert(at, span);
}

/// Conflict checker over a period repository.
pub struct ConflictChecker<'r, R: PeriodRepository> {
    repo: &'r R,
}

impl<'r, R: PeriodRepository> ConflictChecker<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Checks `candidate` against stored periods only.
    ///
    /// `exclude_period_id` names the row being edited so it does not collide
    /// with its own previous value.
    pub fn check(
        &self,
        candidate: &ResolvedPeriod,
        exclude_period_id: Option<PeriodId>,
    ) -> RepoResult<ConflictCheck> {
        self.check_with_pending(candidate, exclude_period_id, &PendingPeriods::default())
    }

    /// Checks `candidate` against stored periods and earlier batch members.
    pub fn check_with_pending(
        &self,
        candidate: &ResolvedPeriod,
        exclude_period_id: Option<PeriodId>,
        pending: &PendingPeriods,
    ) -> RepoResult<ConflictCheck> {
        let stored: Vec<PeriodRecord> = self
            .repo
            .find_conflicting(
                candidate.teacher.profile_id,
                candidate.classroom.id,
                &candidate.slot,
                exclude_period_id,
            )?
            .into_iter()
            .filter(|record| record.slot.overlaps(&candidate.slot))
            .collect();

        let existing = stored
            .iter()
            .find(|record| record.teacher.profile_id == candidate.teacher.profile_id)
            .map(|record| (ConflictKind::Teacher, ConflictingPeriod::Stored(record.clone())))
            .or_else(|| {
                pending.teacher_overlap(candidate).map(|(index, period)| {
                    (
                        ConflictKind::Teacher,
                        ConflictingPeriod::Pending {
                            batch_index: *index,
                            period: period.clone(),
                        },
                    )
                })
            })
            .or_else(|| {
                stored
                    .iter()
                    .find(|record| record.classroom.id == candidate.classroom.id)
                    .map(|record| {
                        (ConflictKind::Classroom, ConflictingPeriod::Stored(record.clone()))
                    })
            })
            .or_else(|| {
                pending.classroom_overlap(candidate).map(|(index, period)| {
                    (
                        ConflictKind::Classroom,
                        ConflictingPeriod::Pending {
                            batch_index: *index,
                            period: period.clone(),
                        },
                    )
                })
            });

        let Some((kind, existing)) = existing else {
            debug!(
                "event=conflict_check module=checker status=clear day={} start_minute={} end_minute={} pending={}",
                candidate.slot.day_number(),
                candidate.slot.start_minute(),
                candidate.slot.end_minute(),
                pending.len()
            );
            return Ok(ConflictCheck::NoConflict);
        };

        debug!(
            "event=conflict_check module=checker status=conflict kind={} day={} start_minute={} end_minute={} existing_period={}",
            kind,
            candidate.slot.day_number(),
            candidate.slot.start_minute(),
            candidate.slot.end_minute(),
            existing
                .period_id()
                .map_or_else(|| "pending".to_string(), |id| id.to_string())
        );
        Ok(ConflictCheck::Conflict(Box::new(ScheduleConflict {
            kind,
            candidate_index: None,
            candidate: candidate.clone(),
            existing,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictKind, PendingPeriods};
    use crate::model::directory::{ClassroomRef, SubjectRef, TeacherRef};
    use crate::model::period::ResolvedPeriod;
    use crate::model::slot::WeeklySlot;
    use uuid::Uuid;

    fn teacher(name: &str) -> TeacherRef {
        TeacherRef {
            profile_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            display_name: name.to_string(),
        }
    }

    fn room(name: &str) -> ClassroomRef {
        ClassroomRef {
            id: Uuid::new_v4(),
            name: name.to_string(),
            capacity: None,
        }
    }

    fn period(
        teacher: &TeacherRef,
        room: &ClassroomRef,
        day: u8,
        start: u16,
        end: u16,
    ) -> ResolvedPeriod {
        ResolvedPeriod {
            slot: WeeklySlot::from_minutes(day, start, end).unwrap(),
            subject: SubjectRef {
                id: Uuid::new_v4(),
                code: "MATH".to_string(),
                name: "Mathematics".to_string(),
            },
            classroom: room.clone(),
            teacher: teacher.clone(),
        }
    }

    #[test]
    fn pending_index_finds_overlap_for_same_teacher_and_day() {
        let jane = teacher("Jane");
        let mut pending = PendingPeriods::new();
        pending.insert(0, period(&jane, &room("101"), 1, 480, 540));
        pending.insert(1, period(&jane, &room("102"), 1, 600, 660));

        let candidate = period(&jane, &room("103"), 1, 630, 690);
        let (index, _) = pending.teacher_overlap(&candidate).unwrap();
        assert_eq!(*index, 1);
        assert!(pending.classroom_overlap(&candidate).is_none());
    }

    #[test]
    fn pending_index_ignores_adjacent_and_other_days() {
        let jane = teacher("Jane");
        let shared_room = room("101");
        let mut pending = PendingPeriods::new();
        pending.insert(0, period(&jane, &shared_room, 1, 480, 540));

        assert!(pending
            .teacher_overlap(&period(&jane, &shared_room, 1, 540, 585))
            .is_none());
        assert!(pending
            .classroom_overlap(&period(&teacher("Sam"), &shared_room, 2, 480, 540))
            .is_none());
    }

    #[test]
    fn pending_index_keeps_spans_sorted_regardless_of_insert_order() {
        let shared_room = room("Lab");
        let mut pending = PendingPeriods::new();
        pending.insert(0, period(&teacher("A"), &shared_room, 3, 720, 780));
        pending.insert(1, period(&teacher("B"), &shared_room, 3, 480, 540));
        pending.insert(2, period(&teacher("C"), &shared_room, 3, 600, 660));

        let candidate = period(&teacher("D"), &shared_room, 3, 500, 610);
        let (index, _) = pending.classroom_overlap(&candidate).unwrap();
        assert_eq!(*index, 1);
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn conflict_kind_serializes_as_wire_code() {
        assert_eq!(
            serde_json::to_string(&ConflictKind::Teacher).unwrap(),
            "\"TEACHER_CONFLICT\""
        );
        assert_eq!(ConflictKind::Classroom.to_string(), "CLASSROOM_CONFLICT");
    }
}
