//! Period repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist period rows and load them with their subject, classroom and
//!   teacher references joined in.
//! - Answer the overlap lookup the conflict checker relies on.
//! - Resolve caller identities (teacher user id, subject, classroom) to
//!   directory references.
//!
//! # Invariants
//! - Conflict lookups are institution-wide: they never filter by timetable,
//!   term or class.
//! - Teacher matching uses the teacher profile only, independent of subject.
//! - Multi-row writes are atomic; they join the caller's transaction when one
//!   is open.

use crate::model::directory::{
    ClassroomId, ClassroomRef, SubjectId, SubjectRef, TeacherProfileId, TeacherRef, UserId,
};
use crate::model::period::{PeriodId, PeriodRecord, ResolvedPeriod};
use crate::model::slot::WeeklySlot;
use crate::model::timetable::TimetableId;
use crate::repo::store::{
    parse_uuid, RepoError, RepoResult, SqliteScheduleRepository, Transactional,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use uuid::Uuid;

const PERIOD_SELECT_SQL: &str = "SELECT
    p.id,
    p.timetable_id,
    p.day_of_week,
    p.start_minute,
    p.end_minute,
    p.duration_minutes,
    p.created_at,
    p.updated_at,
    s.id AS subject_id,
    s.code AS subject_code,
    s.name AS subject_name,
    c.id AS classroom_id,
    c.name AS classroom_name,
    c.capacity AS classroom_capacity,
    t.id AS teacher_profile_id,
    t.user_id AS teacher_user_id,
    t.display_name AS teacher_name
FROM periods p
INNER JOIN subjects s ON s.id = p.subject_id
INNER JOIN classrooms c ON c.id = p.classroom_id
INNER JOIN teacher_profiles t ON t.id = p.teacher_profile_id";

/// Repository interface for period persistence and reference resolution.
pub trait PeriodRepository {
    /// Lists stored periods that share the teacher profile or the classroom
    /// and whose window overlaps `slot` on the same day, ordered by start.
    fn find_conflicting(
        &self,
        teacher_profile_id: TeacherProfileId,
        classroom_id: ClassroomId,
        slot: &WeeklySlot,
        exclude_period_id: Option<PeriodId>,
    ) -> RepoResult<Vec<PeriodRecord>>;
    /// Inserts all periods for one timetable, preserving slice order.
    fn create_many(
        &self,
        timetable_id: TimetableId,
        periods: &[ResolvedPeriod],
    ) -> RepoResult<Vec<PeriodRecord>>;
    /// Deletes every period of one timetable and returns the count.
    fn delete_all_for_timetable(&self, timetable_id: TimetableId) -> RepoResult<usize>;
    /// Overwrites one period in place.
    fn update_period(
        &self,
        period_id: PeriodId,
        period: &ResolvedPeriod,
    ) -> RepoResult<PeriodRecord>;
    fn delete_period(&self, period_id: PeriodId) -> RepoResult<()>;
    fn get_period(&self, period_id: PeriodId) -> RepoResult<Option<PeriodRecord>>;
    /// Lists one timetable's periods by day, start, then insertion order.
    fn list_for_timetable(&self, timetable_id: TimetableId) -> RepoResult<Vec<PeriodRecord>>;
    /// Maps a login identity to its teacher profile, if one exists.
    fn resolve_teacher_profile(&self, user_id: UserId) -> RepoResult<Option<TeacherRef>>;
    fn find_subject(&self, subject_id: SubjectId) -> RepoResult<Option<SubjectRef>>;
    fn find_classroom(&self, classroom_id: ClassroomId) -> RepoResult<Option<ClassroomRef>>;
}

impl PeriodRepository for SqliteScheduleRepository<'_> {
    fn find_conflicting(
        &self,
        teacher_profile_id: TeacherProfileId,
        classroom_id: ClassroomId,
        slot: &WeeklySlot,
        exclude_period_id: Option<PeriodId>,
    ) -> RepoResult<Vec<PeriodRecord>> {
        collect_periods(
            self.conn,
            &format!(
                "{PERIOD_SELECT_SQL}
                 WHERE (p.teacher_profile_id = ?1 OR p.classroom_id = ?2)
                   AND p.day_of_week = ?3
                   AND p.start_minute < ?4
                   AND p.end_minute > ?5
                   AND (?6 IS NULL OR p.id <> ?6)
                 ORDER BY p.start_minute ASC, p.id ASC;"
            ),
            params![
                teacher_profile_id.to_string(),
                classroom_id.to_string(),
                slot.day_number(),
                slot.end_minute(),
                slot.start_minute(),
                exclude_period_id.map(|id| id.to_string()),
            ],
        )
    }

    fn create_many(
        &self,
        timetable_id: TimetableId,
        periods: &[ResolvedPeriod],
    ) -> RepoResult<Vec<PeriodRecord>> {
        self.in_transaction(|| -> RepoResult<Vec<PeriodRecord>> {
            let base_seq = next_period_seq(self.conn, timetable_id)?;
            let mut ids = Vec::with_capacity(periods.len());
            for (offset, period) in periods.iter().enumerate() {
                let id = Uuid::new_v4();
                insert_period(self.conn, id, timetable_id, period, base_seq + offset as i64)?;
                ids.push(id);
            }

            ids.into_iter()
                .map(|id| load_required_period(self.conn, id))
                .collect()
        })
    }

    fn delete_all_for_timetable(&self, timetable_id: TimetableId) -> RepoResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM periods WHERE timetable_id = ?1;",
            [timetable_id.to_string()],
        )?;
        Ok(deleted)
    }

    fn update_period(
        &self,
        period_id: PeriodId,
        period: &ResolvedPeriod,
    ) -> RepoResult<PeriodRecord> {
        let changed = self.conn.execute(
            "UPDATE periods
             SET
                day_of_week = ?2,
                start_minute = ?3,
                end_minute = ?4,
                duration_minutes = ?5,
                subject_id = ?6,
                classroom_id = ?7,
                teacher_profile_id = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                period_id.to_string(),
                period.slot.day_number(),
                period.slot.start_minute(),
                period.slot.end_minute(),
                period.slot.duration_minutes(),
                period.subject.id.to_string(),
                period.classroom.id.to_string(),
                period.teacher.profile_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "period",
                id: period_id,
            });
        }

        load_required_period(self.conn, period_id)
    }

    fn delete_period(&self, period_id: PeriodId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM periods WHERE id = ?1;", [period_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "period",
                id: period_id,
            });
        }
        Ok(())
    }

    fn get_period(&self, period_id: PeriodId) -> RepoResult<Option<PeriodRecord>> {
        let mut periods = collect_periods(
            self.conn,
            &format!("{PERIOD_SELECT_SQL} WHERE p.id = ?1;"),
            [period_id.to_string()],
        )?;
        Ok(periods.pop())
    }

    fn list_for_timetable(&self, timetable_id: TimetableId) -> RepoResult<Vec<PeriodRecord>> {
        collect_periods(
            self.conn,
            &format!(
                "{PERIOD_SELECT_SQL}
                 WHERE p.timetable_id = ?1
                 ORDER BY p.day_of_week ASC, p.start_minute ASC, p.seq ASC, p.id ASC;"
            ),
            [timetable_id.to_string()],
        )
    }

    fn resolve_teacher_profile(&self, user_id: UserId) -> RepoResult<Option<TeacherRef>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, user_id, display_name
                 FROM teacher_profiles
                 WHERE user_id = ?1;",
                [user_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(profile_id, user_id, display_name)| {
            Ok(TeacherRef {
                profile_id: parse_uuid(&profile_id, "teacher_profiles.id")?,
                user_id: parse_uuid(&user_id, "teacher_profiles.user_id")?,
                display_name,
            })
        })
        .transpose()
    }

    fn find_subject(&self, subject_id: SubjectId) -> RepoResult<Option<SubjectRef>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT code, name FROM subjects WHERE id = ?1;",
                [subject_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(code, name)| SubjectRef {
            id: subject_id,
            code,
            name,
        }))
    }

    fn find_classroom(&self, classroom_id: ClassroomId) -> RepoResult<Option<ClassroomRef>> {
        let row: Option<(String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT name, capacity FROM classrooms WHERE id = ?1;",
                [classroom_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(name, capacity)| {
            Ok(ClassroomRef {
                id: classroom_id,
                name,
                capacity: parse_capacity(capacity)?,
            })
        })
        .transpose()
    }
}

fn insert_period(
    conn: &Connection,
    id: PeriodId,
    timetable_id: TimetableId,
    period: &ResolvedPeriod,
    seq: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO periods (
            id,
            timetable_id,
            day_of_week,
            start_minute,
            end_minute,
            duration_minutes,
            subject_id,
            classroom_id,
            teacher_profile_id,
            seq
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            id.to_string(),
            timetable_id.to_string(),
            period.slot.day_number(),
            period.slot.start_minute(),
            period.slot.end_minute(),
            period.slot.duration_minutes(),
            period.subject.id.to_string(),
            period.classroom.id.to_string(),
            period.teacher.profile_id.to_string(),
            seq,
        ],
    )?;
    Ok(())
}

fn next_period_seq(conn: &Connection, timetable_id: TimetableId) -> RepoResult<i64> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(seq) + 1, 0) FROM periods WHERE timetable_id = ?1;",
        [timetable_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn load_required_period(conn: &Connection, period_id: PeriodId) -> RepoResult<PeriodRecord> {
    let mut periods = collect_periods(
        conn,
        &format!("{PERIOD_SELECT_SQL} WHERE p.id = ?1;"),
        [period_id.to_string()],
    )?;
    periods.pop().ok_or(RepoError::NotFound {
        entity: "period",
        id: period_id,
    })
}

fn collect_periods<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepoResult<Vec<PeriodRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut periods = Vec::new();
    while let Some(row) = rows.next()? {
        periods.push(parse_period_row(row)?);
    }
    Ok(periods)
}

fn parse_period_row(row: &Row<'_>) -> RepoResult<PeriodRecord> {
    let id = parse_uuid(&row.get::<_, String>("id")?, "periods.id")?;
    let day: i64 = row.get("day_of_week")?;
    let start_minute: i64 = row.get("start_minute")?;
    let end_minute: i64 = row.get("end_minute")?;
    let slot = WeeklySlot::from_minutes(
        narrow(day, "periods.day_of_week")?,
        narrow(start_minute, "periods.start_minute")?,
        narrow(end_minute, "periods.end_minute")?,
    )
    .map_err(|err| RepoError::InvalidData(format!("period {id}: {err}")))?;

    let duration_minutes: u16 = narrow(row.get("duration_minutes")?, "periods.duration_minutes")?;
    if duration_minutes != slot.duration_minutes() {
        return Err(RepoError::InvalidData(format!(
            "period {id}: stored duration {duration_minutes} does not match window {slot}"
        )));
    }

    Ok(PeriodRecord {
        id,
        timetable_id: parse_uuid(&row.get::<_, String>("timetable_id")?, "periods.timetable_id")?,
        slot,
        duration_minutes,
        subject: SubjectRef {
            id: parse_uuid(&row.get::<_, String>("subject_id")?, "subjects.id")?,
            code: row.get("subject_code")?,
            name: row.get("subject_name")?,
        },
        classroom: ClassroomRef {
            id: parse_uuid(&row.get::<_, String>("classroom_id")?, "classrooms.id")?,
            name: row.get("classroom_name")?,
            capacity: parse_capacity(row.get("classroom_capacity")?)?,
        },
        teacher: TeacherRef {
            profile_id: parse_uuid(
                &row.get::<_, String>("teacher_profile_id")?,
                "teacher_profiles.id",
            )?,
            user_id: parse_uuid(
                &row.get::<_, String>("teacher_user_id")?,
                "teacher_profiles.user_id",
            )?,
            display_name: row.get("teacher_name")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_capacity(value: Option<i64>) -> RepoResult<Option<u32>> {
    value
        .map(|capacity| narrow(capacity, "classrooms.capacity"))
        .transpose()
}

fn narrow<T: TryFrom<i64>>(value: i64, column: &'static str) -> RepoResult<T> {
    T::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value {value} out of range in {column}")))
}
