//! Command-line probe for the scheduling core.
//!
//! # Responsibility
//! - Verify `timetable_core` linkage with `ping` and `version`.
//! - Migrate a database file and print its timetables for local checks.
//!
//! Usage:
//! - `timetable_cli` or `timetable_cli ping`
//! - `timetable_cli migrate <db_path>`
//! - `timetable_cli list <db_path> [term_id]`

use std::error::Error;
use std::fmt::Display;
use std::path::Path;
use std::process::ExitCode;
use timetable_core::{
    init_console_logging, open_db, SqliteScheduleRepository, TermId, TimetableService,
};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    match args.first().map(String::as_str) {
        None | Some("ping") => {
            println!("timetable_core ping={}", timetable_core::ping());
            println!("timetable_core version={}", timetable_core::core_version());
            Ok(())
        }
        Some("version") => {
            println!("{}", timetable_core::core_version());
            Ok(())
        }
        Some("migrate") => {
            let db_path = required_arg(args, 1, "db_path")?;
            init_console_logging(timetable_core::default_log_level())?;
            open_db(Path::new(db_path))?;
            println!(
                "migrated {db_path} to schema version {}",
                timetable_core::db::migrations::latest_version()
            );
            Ok(())
        }
        Some("list") => {
            let db_path = required_arg(args, 1, "db_path")?;
            let term_id = args
                .get(2)
                .map(|raw| raw.parse::<TermId>())
                .transpose()?;
            init_console_logging("warn")?;
            list_timetables(Path::new(db_path), term_id)
        }
        Some(other) => {
            Err(format!("unknown command `{other}`; expected ping|version|migrate|list").into())
        }
    }
}

fn list_timetables(db_path: &Path, term_id: Option<TermId>) -> Result<(), Box<dyn Error>> {
    let conn = open_db(db_path)?;
    let service = TimetableService::new(SqliteScheduleRepository::try_new(&conn)?);

    for timetable in service.list_timetables(term_id)? {
        println!(
            "timetable {} term={} class_group={} class={} periods={}",
            timetable.id,
            timetable.key.term_id,
            display_optional(timetable.key.class_group_id),
            display_optional(timetable.key.class_id),
            timetable.periods.len()
        );
        for period in &timetable.periods {
            println!(
                "  {} {} [{}] room={} teacher={}",
                period.slot,
                period.subject.name,
                period.subject.code,
                period.classroom.name,
                period.teacher.display_name
            );
        }
    }
    Ok(())
}

fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument <{name}>"))
}

fn display_optional<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |id| id.to_string())
}
