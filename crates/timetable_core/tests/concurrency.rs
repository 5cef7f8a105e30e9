mod common;

use common::{count_rows, period, request_for_class, seed_school};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use timetable_core::db::{open_db, open_db_in_memory};
use timetable_core::{
    PeriodRepository, RepoError, ResolvedPeriod, ScheduleError, SqliteScheduleRepository,
    TimetableService, Transactional, WeeklySlot,
};

#[test]
fn concurrent_writers_cannot_double_book_the_same_teacher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.db");
    let seed_conn = open_db(&path).unwrap();
    let school = Arc::new(seed_school(&seed_conn));
    drop(seed_conn);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [school.class_10a.clone(), school.class_10b.clone()]
        .into_iter()
        .map(|class| {
            let path = path.clone();
            let school = Arc::clone(&school);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service =
                    TimetableService::new(SqliteScheduleRepository::try_new(&conn).unwrap());
                let request = request_for_class(
                    &school,
                    &class,
                    vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
                );
                barrier.wait();
                service.assemble(&request).map(|record| record.id)
            })
        })
        .collect();

    let outcomes: Vec<Result<_, ScheduleError>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let committed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(committed, 1, "exactly one writer may win: {outcomes:?}");
    let loser = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err())
        .unwrap();
    assert!(
        loser.conflict().is_some() || loser.is_retryable(),
        "unexpected error: {loser}"
    );

    let conn = open_db(&path).unwrap();
    assert_eq!(count_rows(&conn, "periods"), 1);
    assert_eq!(count_rows(&conn, "timetables"), 1);
}

#[test]
fn slot_index_rejects_double_booking_that_skips_the_checker() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    let timetables = TimetableService::new(repo);
    let first = timetables
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();
    let second = timetables
        .assemble(&request_for_class(&school, &school.class_10b, Vec::new()))
        .unwrap();

    let duplicate = first.periods[0].to_resolved();
    let err = repo.create_many(second.id, &[duplicate]).unwrap_err();
    assert!(matches!(&err, RepoError::Db(db) if db.is_constraint_violation()));

    let mapped = ScheduleError::from(err);
    assert!(mapped.is_retryable());
    assert_eq!(mapped.error_code(), "persistence");
    assert_eq!(count_rows(&conn, "periods"), 1);
}

#[test]
fn failed_work_rolls_back_every_write_in_the_transaction() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    let timetable = TimetableService::new(repo)
        .assemble(&request_for_class(&school, &school.class_10a, Vec::new()))
        .unwrap();
    let candidate = ResolvedPeriod {
        slot: WeeklySlot::from_minutes(2, 480, 540).unwrap(),
        subject: school.math.clone(),
        classroom: school.room_101.clone(),
        teacher: school.jane.clone(),
    };

    let outcome = repo.in_transaction(|| -> Result<(), ScheduleError> {
        repo.create_many(timetable.id, std::slice::from_ref(&candidate))?;
        Err(ScheduleError::InconsistentState("forced failure"))
    });

    assert!(outcome.is_err());
    assert_eq!(count_rows(&conn, "periods"), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn lock_held_past_busy_timeout_is_retryable_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("school.db");
    let holder = open_db(&path).unwrap();
    let school = seed_school(&holder);
    let waiter = open_db(&path).unwrap();
    waiter.busy_timeout(Duration::from_millis(50)).unwrap();
    let service = TimetableService::new(SqliteScheduleRepository::try_new(&waiter).unwrap());

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let err = service
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap_err();
    holder.execute_batch("ROLLBACK;").unwrap();

    assert!(matches!(&err, ScheduleError::Persistence(repo_err) if repo_err.is_busy()));
    assert!(err.is_retryable());
    assert!(waiter.is_autocommit());

    service
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();
}
