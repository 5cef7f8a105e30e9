//! Single-period editing use-cases.
//!
//! # Responsibility
//! - Add, update and delete one period of an existing timetable.
//! - Preview whether a candidate would be accepted without writing.
//!
//! # Invariants
//! - An update is checked with the period's own id excluded, so editing a
//!   period in place never conflicts with its previous value.
//! - Check and write share one transaction.

use crate::model::period::{PeriodId, PeriodInput, PeriodRecord};
use crate::model::timetable::TimetableId;
use crate::service::conflict_checker::{ConflictCheck, ConflictChecker};
use crate::service::error::ScheduleError;
use crate::service::{resolve_period, ScheduleStore};
use log::{info, warn};
use std::slice;
use std::time::Instant;

/// Period service facade over a scheduling store.
pub struct PeriodService<R: ScheduleStore> {
    repo: R,
}

impl<R: ScheduleStore> PeriodService<R> {
    /// Creates a service using the provided store implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a period, or overwrites `existing_period_id` when given.
    ///
    /// # Errors
    /// - `TimetableNotFound` when the timetable does not exist.
    /// - `PeriodNotFound` when `existing_period_id` is unknown or belongs to
    ///   another timetable.
    /// - `Validation`, reference-resolution and `Conflict` errors as for
    ///   timetable assembly.
    pub fn upsert_period(
        &self,
        timetable_id: TimetableId,
        input: &PeriodInput,
        existing_period_id: Option<PeriodId>,
    ) -> Result<PeriodRecord, ScheduleError> {
        let started_at = Instant::now();
        let outcome = self.upsert_checked(timetable_id, input, existing_period_id);
        let operation = if existing_period_id.is_some() {
            "update"
        } else {
            "create"
        };

        match &outcome {
            Ok(record) => info!(
                "event=period_upsert module=service status=ok op={} timetable_id={} period_id={} slot=\"{}\" duration_ms={}",
                operation,
                timetable_id,
                record.id,
                record.slot,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=period_upsert module=service status=rejected op={} timetable_id={} error_code={} retryable={} duration_ms={}",
                operation,
                timetable_id,
                err.error_code(),
                err.is_retryable(),
                started_at.elapsed().as_millis()
            ),
        }
        outcome
    }

    /// Adds one period to a timetable.
    pub fn add_period(
        &self,
        timetable_id: TimetableId,
        input: &PeriodInput,
    ) -> Result<PeriodRecord, ScheduleError> {
        self.upsert_period(timetable_id, input, None)
    }

    /// Overwrites one period of a timetable.
    pub fn update_period(
        &self,
        timetable_id: TimetableId,
        period_id: PeriodId,
        input: &PeriodInput,
    ) -> Result<PeriodRecord, ScheduleError> {
        self.upsert_period(timetable_id, input, Some(period_id))
    }

    pub fn get_period(&self, period_id: PeriodId) -> Result<Option<PeriodRecord>, ScheduleError> {
        Ok(self.repo.get_period(period_id)?)
    }

    /// Deletes one period.
    pub fn delete_period(&self, period_id: PeriodId) -> Result<(), ScheduleError> {
        self.repo.delete_period(period_id)?;
        info!(
            "event=period_delete module=service status=ok period_id={}",
            period_id
        );
        Ok(())
    }

    /// Runs validation, resolution and the conflict check without writing.
    ///
    /// The answer is advisory: a concurrent writer may take the slot before
    /// a later upsert.
    pub fn preview_period(
        &self,
        input: &PeriodInput,
        exclude_period_id: Option<PeriodId>,
    ) -> Result<ConflictCheck, ScheduleError> {
        let validated = input.validate()?;
        let resolved = resolve_period(&self.repo, &validated)?;
        Ok(ConflictChecker::new(&self.repo).check(&resolved, exclude_period_id)?)
    }

    fn upsert_checked(
        &self,
        timetable_id: TimetableId,
        input: &PeriodInput,
        existing_period_id: Option<PeriodId>,
    ) -> Result<PeriodRecord, ScheduleError> {
        let validated = input.validate()?;

        self.repo
            .in_transaction(|| -> Result<PeriodRecord, ScheduleError> {
                if self.repo.get_timetable(timetable_id)?.is_none() {
                    return Err(ScheduleError::TimetableNotFound(timetable_id));
                }
                if let Some(period_id) = existing_period_id {
                    let owned = self
                        .repo
                        .get_period(period_id)?
                        .is_some_and(|record| record.timetable_id == timetable_id);
                    if !owned {
                        return Err(ScheduleError::PeriodNotFound(period_id));
                    }
                }

                let resolved = resolve_period(&self.repo, &validated)?;
                let checker = ConflictChecker::new(&self.repo);
                if let ConflictCheck::Conflict(conflict) =
                    checker.check(&resolved, existing_period_id)?
                {
                    return Err(ScheduleError::Conflict(conflict));
                }

                match existing_period_id {
                    Some(period_id) => Ok(self.repo.update_period(period_id, &resolved)?),
                    None => self
                        .repo
                        .create_many(timetable_id, slice::from_ref(&resolved))?
                        .pop()
                        .ok_or(ScheduleError::InconsistentState(
                            "created period not found in read-back",
                        )),
                }
            })
    }
}
