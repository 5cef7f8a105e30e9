//! Scheduling domain model.
//!
//! # Responsibility
//! - Define the weekly slot, period and timetable shapes shared by
//!   repositories and services.
//! - Keep input validation local and storage-free.
//!
//! # Invariants
//! - Every persisted object is identified by a stable UUID.
//! - Periods are plain weekly recurrences; no date arithmetic is involved.

pub mod directory;
pub mod period;
pub mod slot;
pub mod timetable;
