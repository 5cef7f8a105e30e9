#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use timetable_core::{
    AssembleTimetable, Class, ClassGroup, ClassroomRef, DirectoryRepository, PeriodInput,
    SqliteDirectoryRepository, SubjectRef, TeacherRef, Term, UserId,
};
use uuid::Uuid;

/// Reference data shared by scheduling tests.
pub struct School {
    pub term: Term,
    pub grade_10: ClassGroup,
    pub class_10a: Class,
    pub class_10b: Class,
    pub math: SubjectRef,
    pub physics: SubjectRef,
    pub room_101: ClassroomRef,
    pub room_102: ClassroomRef,
    pub jane: TeacherRef,
    pub sam: TeacherRef,
    /// Login user that has no teacher profile.
    pub visitor: UserId,
}

pub fn seed_school(conn: &Connection) -> School {
    let directory = SqliteDirectoryRepository::try_new(conn).unwrap();
    let term = directory
        .create_term(
            "Fall 2026",
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 18).unwrap(),
        )
        .unwrap();
    let grade_10 = directory.create_class_group("Grade 10").unwrap();
    let class_10a = directory.create_class("10A", Some(grade_10.id)).unwrap();
    let class_10b = directory.create_class("10B", Some(grade_10.id)).unwrap();

    School {
        term,
        class_10a,
        class_10b,
        grade_10,
        math: directory.create_subject("math", "Mathematics").unwrap(),
        physics: directory.create_subject("phys", "Physics").unwrap(),
        room_101: directory.create_classroom("Room 101", Some(30)).unwrap(),
        room_102: directory.create_classroom("Room 102", None).unwrap(),
        jane: directory
            .create_teacher_profile(Uuid::new_v4(), "Jane Smith")
            .unwrap(),
        sam: directory
            .create_teacher_profile(Uuid::new_v4(), "Sam Lee")
            .unwrap(),
        visitor: Uuid::new_v4(),
    }
}

pub fn time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap()
}

pub fn period(
    day: u8,
    start: &str,
    end: &str,
    subject: &SubjectRef,
    room: &ClassroomRef,
    teacher: &TeacherRef,
) -> PeriodInput {
    PeriodInput {
        day_of_week: day,
        start_time: time(start),
        end_time: time(end),
        duration_in_minutes: None,
        subject_id: subject.id,
        classroom_id: room.id,
        teacher_user_id: teacher.user_id,
    }
}

pub fn request_for_class(school: &School, class: &Class, periods: Vec<PeriodInput>) -> AssembleTimetable {
    AssembleTimetable {
        term_id: school.term.id,
        class_group_id: class.class_group_id,
        class_id: Some(class.id),
        periods,
    }
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
