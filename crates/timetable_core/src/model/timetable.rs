//! Timetable aggregate model.
//!
//! # Invariants
//! - At most one timetable exists per `TimetableKey`.
//! - A key names a class group, a class, or both.

use crate::model::directory::{ClassGroupId, ClassId, TermId};
use crate::model::period::{PeriodRecord, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TimetableId = Uuid;

/// The (term, class group, class) triple a timetable is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimetableKey {
    pub term_id: TermId,
    pub class_group_id: Option<ClassGroupId>,
    pub class_id: Option<ClassId>,
}

impl TimetableKey {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.class_group_id.is_none() && self.class_id.is_none() {
            return Err(ValidationError::MissingClassScope);
        }
        Ok(())
    }
}

/// Timetable row without its periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub id: TimetableId,
    pub key: TimetableKey,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Timetable with its periods ordered by day, start time, then insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableRecord {
    pub id: TimetableId,
    pub key: TimetableKey,
    pub created_at: i64,
    pub periods: Vec<PeriodRecord>,
}

impl TimetableRecord {
    pub fn new(timetable: Timetable, periods: Vec<PeriodRecord>) -> Self {
        Self {
            id: timetable.id,
            key: timetable.key,
            created_at: timetable.created_at,
            periods,
        }
    }
}
