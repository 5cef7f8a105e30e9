//! Shared SQLite store handle, repository errors and transaction scope.
//!
//! # Responsibility
//! - Own the connection borrow that the period and timetable repositories
//!   share, so one write transaction covers both.
//! - Verify the connection is migrated before any repository call.
//!
//! # Invariants
//! - `in_transaction` opens `BEGIN IMMEDIATE`: the write lock is taken before
//!   the first conflict read, so check-then-write cannot interleave with
//!   another writer.
//! - Work that fails, or panics, leaves the transaction uncommitted and it
//!   rolls back on drop.
//! - Calls made while a transaction is already open join it under a
//!   savepoint: a failing inner unit undoes only its own writes and leaves
//!   the outer transaction open.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for scheduling persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Caller-supplied value rejected before SQL.
    InvalidArgument(String),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted schedule data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "schedule repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "schedule repository requires table `{table}`")
            }
        }
    }
}

impl RepoError {
    /// Returns whether SQLite stayed locked by another writer past the busy
    /// timeout.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_busy())
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Unit-of-work boundary for multi-step scheduling writes.
pub trait Transactional {
    /// Runs `work` inside one write transaction and commits when it returns
    /// `Ok`. Any `Err` rolls every write made by `work` back.
    fn in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed scheduling store.
///
/// Implements the period, timetable and transaction traits over one borrowed
/// connection. Never caches rows; every read goes to SQLite.
#[derive(Debug, Clone, Copy)]
pub struct SqliteScheduleRepository<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["timetables", "periods", "teacher_profiles"])?;
        Ok(Self { conn })
    }
}

impl Transactional for SqliteScheduleRepository<'_> {
    fn in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return in_savepoint(self.conn, work);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| {
                let err = RepoError::from(err);
                warn!(
                    "event=tx_begin module=repo status=error busy={} error={}",
                    err.is_busy(),
                    err
                );
                err
            })?;
        match work() {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=repo status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

fn in_savepoint<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<RepoError>,
{
    conn.execute_batch("SAVEPOINT schedule_work;")
        .map_err(RepoError::from)?;
    match work() {
        Ok(value) => {
            conn.execute_batch("RELEASE schedule_work;")
                .map_err(RepoError::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch("ROLLBACK TO schedule_work; RELEASE schedule_work;")
            {
                warn!(
                    "event=tx_savepoint_rollback module=repo status=error error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}
