//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for periods, timetables
//!   and directory references.
//! - Isolate SQLite query details from the conflict checker and services.
//!
//! # Invariants
//! - Repositories never cache rows across calls; the database is the single
//!   authoritative copy of the institution-wide period set.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod directory_repo;
pub mod period_repo;
pub mod store;
pub mod timetable_repo;
