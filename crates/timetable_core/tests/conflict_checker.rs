mod common;

use common::{period, request_for_class, seed_school};
use timetable_core::db::open_db_in_memory;
use timetable_core::{
    ConflictCheck, ConflictChecker, ConflictKind, ConflictingPeriod, PeriodRepository,
    ResolvedPeriod, SqliteScheduleRepository, TimetableService, WeeklySlot,
};

fn resolved(
    repo: &SqliteScheduleRepository<'_>,
    slot: WeeklySlot,
    subject_id: uuid::Uuid,
    classroom_id: uuid::Uuid,
    teacher_user_id: uuid::Uuid,
) -> ResolvedPeriod {
    ResolvedPeriod {
        slot,
        subject: repo.find_subject(subject_id).unwrap().unwrap(),
        classroom: repo.find_classroom(classroom_id).unwrap().unwrap(),
        teacher: repo
            .resolve_teacher_profile(teacher_user_id)
            .unwrap()
            .unwrap(),
    }
}

#[test]
fn empty_store_reports_no_conflict() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();

    let candidate = resolved(
        &repo,
        WeeklySlot::from_minutes(1, 480, 540).unwrap(),
        school.math.id,
        school.room_101.id,
        school.jane.user_id,
    );
    let check = ConflictChecker::new(&repo).check(&candidate, None).unwrap();
    assert_eq!(check, ConflictCheck::NoConflict);
}

#[test]
fn teacher_conflict_is_detected_across_subjects_and_rooms() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    TimetableService::new(repo)
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();

    let candidate = resolved(
        &repo,
        WeeklySlot::from_minutes(1, 510, 570).unwrap(),
        school.physics.id,
        school.room_102.id,
        school.jane.user_id,
    );
    let ConflictCheck::Conflict(conflict) = ConflictChecker::new(&repo).check(&candidate, None).unwrap()
    else {
        panic!("expected a teacher conflict");
    };
    assert_eq!(conflict.kind, ConflictKind::Teacher);
    assert_eq!(
        conflict.summary(),
        "teacher Jane Smith is already teaching Mathematics in Room 101 on Mon 08:00-09:00"
    );
}

#[test]
fn classroom_conflict_names_the_booked_room() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    TimetableService::new(repo)
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(2, "10:00", "11:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();

    let candidate = resolved(
        &repo,
        WeeklySlot::from_minutes(2, 630, 690).unwrap(),
        school.physics.id,
        school.room_101.id,
        school.sam.user_id,
    );
    let ConflictCheck::Conflict(conflict) = ConflictChecker::new(&repo).check(&candidate, None).unwrap()
    else {
        panic!("expected a classroom conflict");
    };
    assert_eq!(conflict.kind, ConflictKind::Classroom);
    assert!(conflict.summary().starts_with("classroom Room 101 is already booked"));
}

#[test]
fn teacher_conflict_wins_when_both_resources_collide() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    TimetableService::new(repo)
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(3, "09:00", "10:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();

    let candidate = resolved(
        &repo,
        WeeklySlot::from_minutes(3, 540, 600).unwrap(),
        school.math.id,
        school.room_101.id,
        school.jane.user_id,
    );
    let check = ConflictChecker::new(&repo).check(&candidate, None).unwrap();
    let ConflictCheck::Conflict(conflict) = check else {
        panic!("expected a conflict");
    };
    assert_eq!(conflict.kind, ConflictKind::Teacher);
    assert!(matches!(conflict.existing, ConflictingPeriod::Stored(_)));
}

#[test]
fn adjacent_periods_and_other_days_do_not_conflict() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    TimetableService::new(repo)
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(1, "08:00", "09:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();
    let checker = ConflictChecker::new(&repo);

    let right_after = resolved(
        &repo,
        WeeklySlot::from_minutes(1, 540, 600).unwrap(),
        school.math.id,
        school.room_101.id,
        school.jane.user_id,
    );
    assert!(!checker.check(&right_after, None).unwrap().is_conflict());

    let right_before = resolved(
        &repo,
        WeeklySlot::from_minutes(1, 420, 480).unwrap(),
        school.math.id,
        school.room_101.id,
        school.jane.user_id,
    );
    assert!(!checker.check(&right_before, None).unwrap().is_conflict());

    let tuesday = resolved(
        &repo,
        WeeklySlot::from_minutes(2, 480, 540).unwrap(),
        school.math.id,
        school.room_101.id,
        school.jane.user_id,
    );
    assert!(!checker.check(&tuesday, None).unwrap().is_conflict());
}

#[test]
fn excluded_period_does_not_conflict_with_itself() {
    let conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let repo = SqliteScheduleRepository::try_new(&conn).unwrap();
    let timetable = TimetableService::new(repo)
        .assemble(&request_for_class(
            &school,
            &school.class_10a,
            vec![period(4, "13:00", "14:00", &school.math, &school.room_101, &school.jane)],
        ))
        .unwrap();
    let stored = &timetable.periods[0];

    let checker = ConflictChecker::new(&repo);
    let same_again = stored.to_resolved();
    assert!(checker.check(&same_again, None).unwrap().is_conflict());
    assert_eq!(
        checker.check(&same_again, Some(stored.id)).unwrap(),
        ConflictCheck::NoConflict
    );
}
