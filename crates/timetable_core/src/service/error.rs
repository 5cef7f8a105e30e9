//! Scheduling error taxonomy shared by the assembler and the period editor.
//!
//! # Invariants
//! - Only `Persistence` is safe to retry: every other variant describes the
//!   request itself, and nothing was committed for any variant.

use crate::model::directory::{ClassGroupId, ClassId, ClassroomId, SubjectId, TermId, UserId};
use crate::model::period::{PeriodId, ValidationError};
use crate::model::timetable::{TimetableId, TimetableKey};
use crate::repo::store::RepoError;
use crate::service::conflict_checker::{ConflictKind, ScheduleConflict};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from scheduling use-cases.
#[derive(Debug)]
pub enum ScheduleError {
    /// Malformed input; `batch_index` points at the offending candidate of a
    /// batch submission.
    Validation {
        batch_index: Option<usize>,
        error: ValidationError,
    },
    /// Candidate names a teacher user without a teacher profile.
    TeacherProfileNotFound {
        user_id: UserId,
        batch_index: Option<usize>,
    },
    SubjectNotFound {
        subject_id: SubjectId,
        batch_index: Option<usize>,
    },
    ClassroomNotFound {
        classroom_id: ClassroomId,
        batch_index: Option<usize>,
    },
    TermNotFound(TermId),
    ClassGroupNotFound(ClassGroupId),
    ClassNotFound(ClassId),
    TimetableNotFound(TimetableId),
    /// Period does not exist, or does not belong to the addressed timetable.
    PeriodNotFound(PeriodId),
    /// Candidate collides with a stored or already-accepted period.
    Conflict(Box<ScheduleConflict>),
    /// A timetable already exists for the key.
    Uniqueness {
        key: TimetableKey,
        existing: TimetableId,
    },
    /// Storage failure, including lock timeouts and write-time constraint
    /// violations caused by a concurrent writer.
    Persistence(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ScheduleError {
    /// Returns whether re-running the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// Returns conflict details when this is a conflict error.
    pub fn conflict(&self) -> Option<&ScheduleConflict> {
        match self {
            Self::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    /// Tags a per-candidate error with its position in a batch submission.
    ///
    /// Errors that do not describe a single candidate are returned as-is.
    pub fn at_batch_index(self, index: usize) -> Self {
        match self {
            Self::Validation { error, .. } => Self::Validation {
                batch_index: Some(index),
                error,
            },
            Self::TeacherProfileNotFound { user_id, .. } => Self::TeacherProfileNotFound {
                user_id,
                batch_index: Some(index),
            },
            Self::SubjectNotFound { subject_id, .. } => Self::SubjectNotFound {
                subject_id,
                batch_index: Some(index),
            },
            Self::ClassroomNotFound { classroom_id, .. } => Self::ClassroomNotFound {
                classroom_id,
                batch_index: Some(index),
            },
            other => other,
        }
    }

    /// Position of the failing candidate within a batch, when known.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::Validation { batch_index, .. }
            | Self::TeacherProfileNotFound { batch_index, .. }
            | Self::SubjectNotFound { batch_index, .. }
            | Self::ClassroomNotFound { batch_index, .. } => *batch_index,
            Self::Conflict(conflict) => conflict.candidate_index,
            _ => None,
        }
    }

    /// Stable machine-readable code, used in log events.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::TeacherProfileNotFound { .. } => "teacher_profile_not_found",
            Self::SubjectNotFound { .. } => "subject_not_found",
            Self::ClassroomNotFound { .. } => "classroom_not_found",
            Self::TermNotFound(_) => "term_not_found",
            Self::ClassGroupNotFound(_) => "class_group_not_found",
            Self::ClassNotFound(_) => "class_not_found",
            Self::TimetableNotFound(_) => "timetable_not_found",
            Self::PeriodNotFound(_) => "period_not_found",
            Self::Conflict(conflict) => match conflict.kind {
                ConflictKind::Teacher => "teacher_conflict",
                ConflictKind::Classroom => "classroom_conflict",
            },
            Self::Uniqueness { .. } => "uniqueness",
            Self::Persistence(_) => "persistence",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation {
                batch_index: Some(index),
                error,
            } => write!(f, "period #{} is invalid: {error}", index + 1),
            Self::Validation {
                batch_index: None,
                error,
            } => write!(f, "{error}"),
            Self::TeacherProfileNotFound {
                user_id,
                batch_index,
            } => {
                write_batch_prefix(f, *batch_index)?;
                write!(f, "teacher profile not found for user {user_id}")
            }
            Self::SubjectNotFound {
                subject_id,
                batch_index,
            } => {
                write_batch_prefix(f, *batch_index)?;
                write!(f, "subject not found: {subject_id}")
            }
            Self::ClassroomNotFound {
                classroom_id,
                batch_index,
            } => {
                write_batch_prefix(f, *batch_index)?;
                write!(f, "classroom not found: {classroom_id}")
            }
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::ClassGroupNotFound(id) => write!(f, "class group not found: {id}"),
            Self::ClassNotFound(id) => write!(f, "class not found: {id}"),
            Self::TimetableNotFound(id) => write!(f, "timetable not found: {id}"),
            Self::PeriodNotFound(id) => write!(f, "period not found: {id}"),
            Self::Conflict(conflict) => write!(f, "{}: {}", conflict.kind, conflict.summary()),
            Self::Uniqueness { key, existing } => write!(
                f,
                "timetable {existing} already exists for term {}{}{}",
                key.term_id,
                key.class_group_id
                    .map(|id| format!(", class group {id}"))
                    .unwrap_or_default(),
                key.class_id
                    .map(|id| format!(", class {id}"))
                    .unwrap_or_default()
            ),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent schedule state: {details}")
            }
        }
    }
}

fn write_batch_prefix(f: &mut Formatter<'_>, batch_index: Option<usize>) -> std::fmt::Result {
    match batch_index {
        Some(index) => write!(f, "period #{}: ", index + 1),
        None => Ok(()),
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation { error, .. } => Some(error),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ScheduleError {
    fn from(value: ValidationError) -> Self {
        Self::Validation {
            batch_index: None,
            error: value,
        }
    }
}

impl From<RepoError> for ScheduleError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "timetable",
                id,
            } => Self::TimetableNotFound(id),
            RepoError::NotFound {
                entity: "period",
                id,
            } => Self::PeriodNotFound(id),
            other => Self::Persistence(other),
        }
    }
}
