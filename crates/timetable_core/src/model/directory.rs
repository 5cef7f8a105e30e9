//! Reference entities owned by the surrounding administration system.
//!
//! The scheduling core never edits these beyond seeding; it reads them to
//! attribute periods and to render conflicts with human names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TermId = Uuid;
pub type ClassGroupId = Uuid;
pub type ClassId = Uuid;
pub type SubjectId = Uuid;
pub type ClassroomId = Uuid;
pub type TeacherProfileId = Uuid;
/// Login identity of a teacher, as supplied by request callers.
pub type UserId = Uuid;

/// A bounded academic period, e.g. a semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub name: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: ClassGroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub class_group_id: Option<ClassGroupId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub id: SubjectId,
    pub code: String,
    pub name: String,
}

/// Physical room. Capacity is informational; scheduling only enforces
/// temporal exclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassroomRef {
    pub id: ClassroomId,
    pub name: String,
    pub capacity: Option<u32>,
}

/// Scheduling identity of one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherRef {
    pub profile_id: TeacherProfileId,
    pub user_id: UserId,
    pub display_name: String,
}
