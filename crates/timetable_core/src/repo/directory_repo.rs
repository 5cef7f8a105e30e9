//! Directory repository for scheduling reference entities.
//!
//! # Responsibility
//! - Create and load the terms, class groups, classes, subjects, classrooms
//!   and teacher profiles that periods and timetables point at.
//!
//! The administration system owns full CRUD for these; the scheduling core
//! only needs to seed them and read them back.
//!
//! # Invariants
//! - Names are trimmed and must not be blank.
//! - One teacher profile per user id; subject codes are unique.

use crate::model::directory::{
    Class, ClassGroup, ClassGroupId, ClassroomRef, SubjectRef, TeacherRef, Term, TermId, UserId,
};
use crate::repo::store::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for directory reference data.
pub trait DirectoryRepository {
    fn create_term(&self, name: &str, starts_on: NaiveDate, ends_on: NaiveDate)
        -> RepoResult<Term>;
    fn get_term(&self, term_id: TermId) -> RepoResult<Option<Term>>;
    fn create_class_group(&self, name: &str) -> RepoResult<ClassGroup>;
    fn create_class(&self, name: &str, class_group_id: Option<ClassGroupId>) -> RepoResult<Class>;
    fn create_subject(&self, code: &str, name: &str) -> RepoResult<SubjectRef>;
    fn create_classroom(&self, name: &str, capacity: Option<u32>) -> RepoResult<ClassroomRef>;
    /// Registers the scheduling identity for one login user.
    fn create_teacher_profile(&self, user_id: UserId, display_name: &str)
        -> RepoResult<TeacherRef>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                "terms",
                "class_groups",
                "classes",
                "subjects",
                "classrooms",
                "teacher_profiles",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn create_term(
        &self,
        name: &str,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> RepoResult<Term> {
        let name = normalize_name(name, "term name")?;
        if starts_on > ends_on {
            return Err(RepoError::InvalidArgument(format!(
                "term `{name}` starts on {starts_on} after it ends on {ends_on}"
            )));
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO terms (id, name, starts_on, ends_on) VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), name.as_str(), starts_on, ends_on],
        )?;
        Ok(Term {
            id,
            name,
            starts_on,
            ends_on,
        })
    }

    fn get_term(&self, term_id: TermId) -> RepoResult<Option<Term>> {
        let row: Option<(String, NaiveDate, NaiveDate)> = self
            .conn
            .query_row(
                "SELECT name, starts_on, ends_on FROM terms WHERE id = ?1;",
                [term_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(name, starts_on, ends_on)| Term {
            id: term_id,
            name,
            starts_on,
            ends_on,
        }))
    }

    fn create_class_group(&self, name: &str) -> RepoResult<ClassGroup> {
        let name = normalize_name(name, "class group name")?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO class_groups (id, name) VALUES (?1, ?2);",
            params![id.to_string(), name.as_str()],
        )?;
        Ok(ClassGroup { id, name })
    }

    fn create_class(&self, name: &str, class_group_id: Option<ClassGroupId>) -> RepoResult<Class> {
        let name = normalize_name(name, "class name")?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO classes (id, class_group_id, name) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                class_group_id.map(|value| value.to_string()),
                name.as_str(),
            ],
        )?;
        Ok(Class {
            id,
            class_group_id,
            name,
        })
    }

    fn create_subject(&self, code: &str, name: &str) -> RepoResult<SubjectRef> {
        let code = normalize_name(code, "subject code")?.to_uppercase();
        let name = normalize_name(name, "subject name")?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO subjects (id, code, name) VALUES (?1, ?2, ?3);",
            params![id.to_string(), code.as_str(), name.as_str()],
        )?;
        Ok(SubjectRef { id, code, name })
    }

    fn create_classroom(&self, name: &str, capacity: Option<u32>) -> RepoResult<ClassroomRef> {
        let name = normalize_name(name, "classroom name")?;
        if capacity == Some(0) {
            return Err(RepoError::InvalidArgument(format!(
                "classroom `{name}` capacity must be positive"
            )));
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO classrooms (id, name, capacity) VALUES (?1, ?2, ?3);",
            params![id.to_string(), name.as_str(), capacity],
        )?;
        Ok(ClassroomRef { id, name, capacity })
    }

    fn create_teacher_profile(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> RepoResult<TeacherRef> {
        let display_name = normalize_name(display_name, "teacher display name")?;
        let profile_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO teacher_profiles (id, user_id, display_name) VALUES (?1, ?2, ?3);",
            params![
                profile_id.to_string(),
                user_id.to_string(),
                display_name.as_str()
            ],
        )?;
        Ok(TeacherRef {
            profile_id,
            user_id,
            display_name,
        })
    }
}

fn normalize_name(value: &str, field: &'static str) -> RepoResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidArgument(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}
