//! Core scheduling use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI and transport layers decoupled from storage details.

pub mod conflict_checker;
pub mod error;
pub mod period_service;
pub mod timetable_service;

use crate::model::period::{ResolvedPeriod, ValidatedPeriod};
use crate::repo::period_repo::PeriodRepository;
use crate::repo::store::Transactional;
use crate::repo::timetable_repo::TimetableRepository;
use crate::service::error::ScheduleError;

/// Storage capabilities the scheduling services need from one backend.
pub trait ScheduleStore: PeriodRepository + TimetableRepository + Transactional {}

impl<T> ScheduleStore for T where T: PeriodRepository + TimetableRepository + Transactional {}

/// Resolves the references of one validated period.
///
/// The teacher profile is resolved first; a user without one fails before
/// subject and classroom are looked up.
pub(crate) fn resolve_period<R: PeriodRepository>(
    repo: &R,
    period: &ValidatedPeriod,
) -> Result<ResolvedPeriod, ScheduleError> {
    let teacher = repo
        .resolve_teacher_profile(period.teacher_user_id)?
        .ok_or(ScheduleError::TeacherProfileNotFound {
            user_id: period.teacher_user_id,
            batch_index: None,
        })?;
    let subject = repo
        .find_subject(period.subject_id)?
        .ok_or(ScheduleError::SubjectNotFound {
            subject_id: period.subject_id,
            batch_index: None,
        })?;
    let classroom = repo
        .find_classroom(period.classroom_id)?
        .ok_or(ScheduleError::ClassroomNotFound {
            classroom_id: period.classroom_id,
            batch_index: None,
        })?;

    Ok(ResolvedPeriod {
        slot: period.slot,
        subject,
        classroom,
        teacher,
    })
}
