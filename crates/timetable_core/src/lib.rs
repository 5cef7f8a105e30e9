//! Core scheduling engine for weekly school timetables.
//! This crate is the single source of truth for booking invariants: no
//! teacher and no classroom is ever double-booked.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_console_logging, init_logging, logging_status, LogTarget};
pub use model::directory::{
    Class, ClassGroup, ClassGroupId, ClassId, ClassroomId, ClassroomRef, SubjectId, SubjectRef,
    TeacherProfileId, TeacherRef, Term, TermId, UserId,
};
pub use model::period::{
    PeriodId, PeriodInput, PeriodRecord, ResolvedPeriod, ValidatedPeriod, ValidationError,
    MAX_PERIOD_MINUTES,
};
pub use model::slot::{overlaps, SlotValidationError, WeeklySlot};
pub use model::timetable::{Timetable, TimetableId, TimetableKey, TimetableRecord};
pub use repo::directory_repo::{DirectoryRepository, SqliteDirectoryRepository};
pub use repo::period_repo::PeriodRepository;
pub use repo::store::{RepoError, RepoResult, SqliteScheduleRepository, Transactional};
pub use repo::timetable_repo::TimetableRepository;
pub use service::conflict_checker::{
    ConflictCheck, ConflictChecker, ConflictKind, ConflictingPeriod, PendingPeriods,
    ScheduleConflict,
};
pub use service::error::ScheduleError;
pub use service::period_service::PeriodService;
pub use service::timetable_service::{AssembleTimetable, AssemblyState, TimetableService};
pub use service::ScheduleStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
