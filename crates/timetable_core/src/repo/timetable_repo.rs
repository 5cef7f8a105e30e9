//! Timetable repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist timetable aggregate rows.
//! - Look up timetables by their (term, class group, class) key.
//!
//! # Invariants
//! - Key lookups treat a missing class group or class as its own value,
//!   matching the `idx_timetables_key` unique index.
//! - Deleting a timetable removes its periods through `ON DELETE CASCADE`.

use crate::model::directory::{ClassGroupId, ClassId, TermId};
use crate::model::timetable::{Timetable, TimetableId, TimetableKey};
use crate::repo::store::{parse_optional_uuid, parse_uuid, RepoError, RepoResult, SqliteScheduleRepository};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const TIMETABLE_SELECT_SQL: &str = "SELECT
    id,
    term_id,
    class_group_id,
    class_id,
    created_at
FROM timetables";

/// Repository interface for timetable rows.
pub trait TimetableRepository {
    fn term_exists(&self, term_id: TermId) -> RepoResult<bool>;
    fn class_group_exists(&self, class_group_id: ClassGroupId) -> RepoResult<bool>;
    fn class_exists(&self, class_id: ClassId) -> RepoResult<bool>;
    /// Returns the id of the timetable owning `key`, if any.
    fn find_by_key(&self, key: &TimetableKey) -> RepoResult<Option<TimetableId>>;
    fn create_timetable(&self, key: &TimetableKey) -> RepoResult<Timetable>;
    fn get_timetable(&self, timetable_id: TimetableId) -> RepoResult<Option<Timetable>>;
    /// Lists timetables, optionally for one term, oldest first.
    fn list_timetables(&self, term_id: Option<TermId>) -> RepoResult<Vec<Timetable>>;
    /// Deletes one timetable together with its periods.
    fn delete_timetable(&self, timetable_id: TimetableId) -> RepoResult<()>;
}

impl TimetableRepository for SqliteScheduleRepository<'_> {
    fn term_exists(&self, term_id: TermId) -> RepoResult<bool> {
        row_exists(self.conn, "SELECT EXISTS(SELECT 1 FROM terms WHERE id = ?1);", term_id)
    }

    fn class_group_exists(&self, class_group_id: ClassGroupId) -> RepoResult<bool> {
        row_exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM class_groups WHERE id = ?1);",
            class_group_id,
        )
    }

    fn class_exists(&self, class_id: ClassId) -> RepoResult<bool> {
        row_exists(self.conn, "SELECT EXISTS(SELECT 1 FROM classes WHERE id = ?1);", class_id)
    }

    fn find_by_key(&self, key: &TimetableKey) -> RepoResult<Option<TimetableId>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id
                 FROM timetables
                 WHERE term_id = ?1
                   AND IFNULL(class_group_id, '') = IFNULL(?2, '')
                   AND IFNULL(class_id, '') = IFNULL(?3, '');",
                params![
                    key.term_id.to_string(),
                    key.class_group_id.map(|id| id.to_string()),
                    key.class_id.map(|id| id.to_string()),
                ],
                |row| row.get(0),
            )
            .optional()?;

        id.map(|value| parse_uuid(&value, "timetables.id"))
            .transpose()
    }

    fn create_timetable(&self, key: &TimetableKey) -> RepoResult<Timetable> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO timetables (id, term_id, class_group_id, class_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                key.term_id.to_string(),
                key.class_group_id.map(|value| value.to_string()),
                key.class_id.map(|value| value.to_string()),
            ],
        )?;

        self.get_timetable(id)?.ok_or(RepoError::NotFound {
            entity: "timetable",
            id,
        })
    }

    fn get_timetable(&self, timetable_id: TimetableId) -> RepoResult<Option<Timetable>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TIMETABLE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([timetable_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_timetable_row(row)?));
        }
        Ok(None)
    }

    fn list_timetables(&self, term_id: Option<TermId>) -> RepoResult<Vec<Timetable>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TIMETABLE_SELECT_SQL}
             WHERE (?1 IS NULL OR term_id = ?1)
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([term_id.map(|id| id.to_string())])?;
        let mut timetables = Vec::new();
        while let Some(row) = rows.next()? {
            timetables.push(parse_timetable_row(row)?);
        }
        Ok(timetables)
    }

    fn delete_timetable(&self, timetable_id: TimetableId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM timetables WHERE id = ?1;",
            [timetable_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "timetable",
                id: timetable_id,
            });
        }
        Ok(())
    }
}

fn row_exists(conn: &Connection, sql: &str, id: Uuid) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(sql, [id.to_string()], |row| row.get(0))?;
    Ok(exists == 1)
}

fn parse_timetable_row(row: &Row<'_>) -> RepoResult<Timetable> {
    Ok(Timetable {
        id: parse_uuid(&row.get::<_, String>("id")?, "timetables.id")?,
        key: TimetableKey {
            term_id: parse_uuid(&row.get::<_, String>("term_id")?, "timetables.term_id")?,
            class_group_id: parse_optional_uuid(
                row.get("class_group_id")?,
                "timetables.class_group_id",
            )?,
            class_id: parse_optional_uuid(row.get("class_id")?, "timetables.class_id")?,
        },
        created_at: row.get("created_at")?,
    })
}
