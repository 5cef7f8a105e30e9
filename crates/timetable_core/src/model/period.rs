//! Period domain model.
//!
//! # Responsibility
//! - Define the caller-facing period descriptor and its local validation.
//! - Define the resolved and persisted shapes the conflict checker and
//!   repositories exchange.
//!
//! # Invariants
//! - `duration_minutes` always equals the slot length and lies in (0, 240].
//! - A `ResolvedPeriod` references an existing subject, classroom and
//!   teacher profile.

use crate::model::directory::{ClassroomId, ClassroomRef, SubjectId, SubjectRef, TeacherRef, UserId};
use crate::model::slot::{SlotValidationError, WeeklySlot};
use crate::model::timetable::TimetableId;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one period row.
pub type PeriodId = Uuid;

/// Upper bound for a single period, in minutes.
pub const MAX_PERIOD_MINUTES: u16 = 240;

/// Input validation failures, detected before any storage access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    Slot(SlotValidationError),
    /// Duration outside (0, 240] minutes.
    DurationOutOfRange(u16),
    /// Declared duration disagrees with the time window.
    DurationMismatch { declared: u16, actual: u16 },
    /// Timetable key names neither a class group nor a class.
    MissingClassScope,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slot(err) => write!(f, "{err}"),
            Self::DurationOutOfRange(minutes) => write!(
                f,
                "period duration must be between 1 and {MAX_PERIOD_MINUTES} minutes, got {minutes}"
            ),
            Self::DurationMismatch { declared, actual } => write!(
                f,
                "declared duration {declared} minutes does not match the {actual} minute window"
            ),
            Self::MissingClassScope => {
                write!(f, "timetable needs a class group, a class, or both")
            }
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Slot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SlotValidationError> for ValidationError {
    fn from(value: SlotValidationError) -> Self {
        Self::Slot(value)
    }
}

/// Period descriptor as submitted by a caller.
///
/// `teacher_user_id` is the login identity; it is resolved to a teacher
/// profile before conflict checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    /// 1 (Monday) ..= 7 (Sunday).
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Derived from the window when omitted.
    #[serde(default)]
    pub duration_in_minutes: Option<u16>,
    pub subject_id: SubjectId,
    pub classroom_id: ClassroomId,
    pub teacher_user_id: UserId,
}

impl PeriodInput {
    /// Runs every local check: day range, window shape, duration bounds and
    /// declared-vs-actual duration.
    pub fn validate(&self) -> Result<ValidatedPeriod, ValidationError> {
        if let Some(declared) = self.duration_in_minutes {
            if declared == 0 || declared > MAX_PERIOD_MINUTES {
                return Err(ValidationError::DurationOutOfRange(declared));
            }
        }

        let slot = WeeklySlot::from_day_number(self.day_of_week, self.start_time, self.end_time)?;
        let actual = slot.duration_minutes();
        if actual > MAX_PERIOD_MINUTES {
            return Err(ValidationError::DurationOutOfRange(actual));
        }
        if let Some(declared) = self.duration_in_minutes {
            if declared != actual {
                return Err(ValidationError::DurationMismatch { declared, actual });
            }
        }

        Ok(ValidatedPeriod {
            slot,
            subject_id: self.subject_id,
            classroom_id: self.classroom_id,
            teacher_user_id: self.teacher_user_id,
        })
    }
}

/// Locally valid period whose references are still unresolved ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPeriod {
    pub slot: WeeklySlot,
    pub subject_id: SubjectId,
    pub classroom_id: ClassroomId,
    pub teacher_user_id: UserId,
}

/// Period whose references were resolved against the directory; the unit
/// the conflict checker compares and repositories persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeriod {
    pub slot: WeeklySlot,
    pub subject: SubjectRef,
    pub classroom: ClassroomRef,
    pub teacher: TeacherRef,
}

/// Persisted period with its resolved references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub id: PeriodId,
    pub timetable_id: TimetableId,
    pub slot: WeeklySlot,
    pub duration_minutes: u16,
    pub subject: SubjectRef,
    pub classroom: ClassroomRef,
    pub teacher: TeacherRef,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl PeriodRecord {
    /// Returns the fields that matter for scheduling, dropping row metadata.
    pub fn to_resolved(&self) -> ResolvedPeriod {
        ResolvedPeriod {
            slot: self.slot,
            subject: self.subject.clone(),
            classroom: self.classroom.clone(),
            teacher: self.teacher.clone(),
        }
    }
}
