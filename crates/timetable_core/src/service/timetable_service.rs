//! Timetable assembly use-cases.
//!
//! # Responsibility
//! - Create a timetable together with its initial periods as one unit.
//! - Replace the full period set of an existing timetable.
//! - Read, list and delete timetable aggregates.
//!
//! # Invariants
//! - Assembly is all-or-nothing: on any error no timetable row and no period
//!   row is left behind.
//! - At most one timetable exists per (term, class group, class) key.
//! - Candidates are checked in submission order against stored periods and
//!   against candidates accepted before them; the first failure stops the
//!   batch.
//! - Returned periods are ordered by day, start, then submission order.

use crate::model::directory::{ClassGroupId, ClassId, TermId};
use crate::model::period::{PeriodInput, PeriodRecord, ResolvedPeriod, ValidatedPeriod};
use crate::model::timetable::{TimetableId, TimetableKey, TimetableRecord};
use crate::service::conflict_checker::{ConflictCheck, ConflictChecker, PendingPeriods};
use crate::service::error::ScheduleError;
use crate::service::{resolve_period, ScheduleStore};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Request to create one timetable with its initial periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembleTimetable {
    pub term_id: TermId,
    #[serde(default)]
    pub class_group_id: Option<ClassGroupId>,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub periods: Vec<PeriodInput>,
}

impl AssembleTimetable {
    pub fn key(&self) -> TimetableKey {
        TimetableKey {
            term_id: self.term_id,
            class_group_id: self.class_group_id,
            class_id: self.class_id,
        }
    }
}

/// Lifecycle of one assembly request, reported in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Validating,
    Persisting,
    Committed,
    Rejected,
}

impl AssemblyState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }
}

/// Timetable service facade over a scheduling store.
pub struct TimetableService<R: ScheduleStore> {
    repo: R,
}

impl<R: ScheduleStore> TimetableService<R> {
    /// Creates a service using the provided store implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a timetable and all of its periods atomically.
    ///
    /// # Errors
    /// - `Validation` for malformed input, with the offending batch index.
    /// - `TermNotFound`, `ClassGroupNotFound`, `ClassNotFound`, `Uniqueness`
    ///   for a bad or already-used key.
    /// - `TeacherProfileNotFound`, `SubjectNotFound`, `ClassroomNotFound`
    ///   when a candidate references unknown entities, with its batch index.
    /// - `Conflict` for the first double-booked candidate.
    /// - `Persistence` when storage fails; safe to retry.
    pub fn assemble(&self, request: &AssembleTimetable) -> Result<TimetableRecord, ScheduleError> {
        let started_at = Instant::now();
        let key = request.key();
        log_state("timetable_assemble", AssemblyState::Validating, request.periods.len());

        let outcome = self.assemble_checked(key, &request.periods);
        log_outcome("timetable_assemble", started_at, &outcome);
        outcome
    }

    /// Replaces every period of one timetable with `periods` atomically.
    ///
    /// Slots freed by the old periods are available to the new ones. On
    /// error the old periods stay untouched.
    pub fn replace_periods(
        &self,
        timetable_id: TimetableId,
        periods: &[PeriodInput],
    ) -> Result<TimetableRecord, ScheduleError> {
        let started_at = Instant::now();
        log_state("timetable_replace", AssemblyState::Validating, periods.len());

        let outcome = self.replace_checked(timetable_id, periods);
        log_outcome("timetable_replace", started_at, &outcome);
        outcome
    }

    /// Loads one timetable with its ordered periods.
    pub fn get_timetable(
        &self,
        timetable_id: TimetableId,
    ) -> Result<Option<TimetableRecord>, ScheduleError> {
        let Some(timetable) = self.repo.get_timetable(timetable_id)? else {
            return Ok(None);
        };
        let periods = self.repo.list_for_timetable(timetable_id)?;
        Ok(Some(TimetableRecord::new(timetable, periods)))
    }

    /// Lists timetables, optionally for one term, with their periods.
    pub fn list_timetables(
        &self,
        term_id: Option<TermId>,
    ) -> Result<Vec<TimetableRecord>, ScheduleError> {
        self.repo
            .list_timetables(term_id)?
            .into_iter()
            .map(|timetable| -> Result<TimetableRecord, ScheduleError> {
                let periods = self.repo.list_for_timetable(timetable.id)?;
                Ok(TimetableRecord::new(timetable, periods))
            })
            .collect()
    }

    /// Deletes one timetable and its periods.
    pub fn delete_timetable(&self, timetable_id: TimetableId) -> Result<(), ScheduleError> {
        self.repo.delete_timetable(timetable_id)?;
        info!(
            "event=timetable_delete module=service status=ok timetable_id={}",
            timetable_id
        );
        Ok(())
    }

    fn assemble_checked(
        &self,
        key: TimetableKey,
        inputs: &[PeriodInput],
    ) -> Result<TimetableRecord, ScheduleError> {
        key.validate()?;
        let validated = validate_batch(inputs)?;

        self.repo
            .in_transaction(|| -> Result<TimetableRecord, ScheduleError> {
                if !self.repo.term_exists(key.term_id)? {
                    return Err(ScheduleError::TermNotFound(key.term_id));
                }
                if let Some(class_group_id) = key.class_group_id {
                    if !self.repo.class_group_exists(class_group_id)? {
                        return Err(ScheduleError::ClassGroupNotFound(class_group_id));
                    }
                }
                if let Some(class_id) = key.class_id {
                    if !self.repo.class_exists(class_id)? {
                        return Err(ScheduleError::ClassNotFound(class_id));
                    }
                }
                if let Some(existing) = self.repo.find_by_key(&key)? {
                    return Err(ScheduleError::Uniqueness { key, existing });
                }

                let accepted = self.resolve_and_check(&validated)?;
                log_state("timetable_assemble", AssemblyState::Persisting, accepted.len());
                let timetable = self.repo.create_timetable(&key)?;
                let periods = self.repo.create_many(timetable.id, &accepted)?;
                Ok(TimetableRecord::new(timetable, ordered(periods)))
            })
    }

    fn replace_checked(
        &self,
        timetable_id: TimetableId,
        inputs: &[PeriodInput],
    ) -> Result<TimetableRecord, ScheduleError> {
        let validated = validate_batch(inputs)?;

        self.repo
            .in_transaction(|| -> Result<TimetableRecord, ScheduleError> {
                let timetable = self
                    .repo
                    .get_timetable(timetable_id)?
                    .ok_or(ScheduleError::TimetableNotFound(timetable_id))?;

                let removed = self.repo.delete_all_for_timetable(timetable_id)?;
                debug!(
                    "event=timetable_replace module=service status=cleared timetable_id={} removed={}",
                    timetable_id, removed
                );

                let accepted = self.resolve_and_check(&validated)?;
                log_state("timetable_replace", AssemblyState::Persisting, accepted.len());
                let periods = self.repo.create_many(timetable_id, &accepted)?;
                Ok(TimetableRecord::new(timetable, ordered(periods)))
            })
    }

    fn resolve_and_check(
        &self,
        validated: &[ValidatedPeriod],
    ) -> Result<Vec<ResolvedPeriod>, ScheduleError> {
        let checker = ConflictChecker::new(&self.repo);
        let mut pending = PendingPeriods::new();

        for (index, period) in validated.iter().enumerate() {
            let resolved =
                resolve_period(&self.repo, period).map_err(|err| err.at_batch_index(index))?;
            match checker.check_with_pending(&resolved, None, &pending)? {
                ConflictCheck::NoConflict => pending.insert(index, resolved),
                ConflictCheck::Conflict(mut conflict) => {
                    conflict.candidate_index = Some(index);
                    return Err(ScheduleError::Conflict(conflict));
                }
            }
        }

        Ok(pending.into_periods())
    }
}

fn validate_batch(inputs: &[PeriodInput]) -> Result<Vec<ValidatedPeriod>, ScheduleError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            input
                .validate()
                .map_err(|error| ScheduleError::from(error).at_batch_index(index))
        })
        .collect()
}

fn ordered(mut periods: Vec<PeriodRecord>) -> Vec<PeriodRecord> {
    // Stable sort keeps submission order for equal windows.
    periods.sort_by_key(|period| period.slot.sort_key());
    periods
}

fn log_state(event: &str, state: AssemblyState, periods: usize) {
    debug!(
        "event={} module=service state={} periods={}",
        event,
        state.as_str(),
        periods
    );
}

fn log_outcome(
    event: &str,
    started_at: Instant,
    outcome: &Result<TimetableRecord, ScheduleError>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(record) => info!(
            "event={} module=service status=ok state={} timetable_id={} periods={} duration_ms={}",
            event,
            AssemblyState::Committed.as_str(),
            record.id,
            record.periods.len(),
            duration_ms
        ),
        Err(err) => warn!(
            "event={} module=service status=rejected state={} error_code={} retryable={} duration_ms={}",
            event,
            AssemblyState::Rejected.as_str(),
            err.error_code(),
            err.is_retryable(),
            duration_ms
        ),
    }
}
