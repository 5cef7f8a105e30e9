//! Weekly time-slot model.
//!
//! # Responsibility
//! - Represent one recurring weekly block: day of week plus a time window.
//! - Provide the overlap relation every conflict decision is built on.
//!
//! # Invariants
//! - `start < end` on the same day; a slot never wraps past midnight.
//! - Times sit on whole minutes, matching the minute-resolution storage.
//! - Windows are half-open `[start, end)`: back-to-back slots do not overlap.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Reasons a day/time triple cannot form a `WeeklySlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValidationError {
    /// Day number outside 1 (Monday) ..= 7 (Sunday).
    DayOutOfRange(u8),
    /// `start >= end`.
    EmptyWindow { start: NaiveTime, end: NaiveTime },
    /// Time carries seconds or sub-second precision.
    NotWholeMinute(NaiveTime),
    /// Stored minute offset outside one day.
    MinuteOutOfRange(u16),
}

impl Display for SlotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DayOutOfRange(day) => {
                write!(f, "day of week must be 1 (Monday) to 7 (Sunday), got {day}")
            }
            Self::EmptyWindow { start, end } => write!(
                f,
                "start time {} must be before end time {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            ),
            Self::NotWholeMinute(time) => {
                write!(f, "time {time} must fall on a whole minute")
            }
            Self::MinuteOutOfRange(minute) => {
                write!(f, "minute offset {minute} is outside one day")
            }
        }
    }
}

impl Error for SlotValidationError {}

/// One recurring weekly block, e.g. every Monday 08:00-09:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSlot", into = "RawSlot")]
pub struct WeeklySlot {
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
}

impl WeeklySlot {
    /// Builds a slot after checking the window.
    pub fn new(day: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, SlotValidationError> {
        for time in [start, end] {
            if time.second() != 0 || time.nanosecond() != 0 {
                return Err(SlotValidationError::NotWholeMinute(time));
            }
        }
        if start >= end {
            return Err(SlotValidationError::EmptyWindow { start, end });
        }
        Ok(Self { day, start, end })
    }

    /// Builds a slot from a 1-based day number (Monday = 1).
    pub fn from_day_number(
        day: u8,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Self, SlotValidationError> {
        Self::new(weekday_from_number(day)?, start, end)
    }

    /// Decodes the storage form: day number plus minutes from midnight.
    pub fn from_minutes(
        day: u8,
        start_minute: u16,
        end_minute: u16,
    ) -> Result<Self, SlotValidationError> {
        Self::from_day_number(day, time_from_minute(start_minute)?, time_from_minute(end_minute)?)
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    /// 1 (Monday) ..= 7 (Sunday).
    pub fn day_number(&self) -> u8 {
        // number_from_monday is always 1..=7.
        self.day.number_from_monday() as u8
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn start_minute(&self) -> u16 {
        minute_of_day(self.start)
    }

    pub fn end_minute(&self) -> u16 {
        minute_of_day(self.end)
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_minute() - self.start_minute()
    }

    /// Returns whether both slots fall on the same day and their half-open
    /// windows intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }

    /// Total order used for display: day, then start, then end.
    pub fn sort_key(&self) -> (u8, u16, u16) {
        (self.day_number(), self.start_minute(), self.end_minute())
    }
}

impl Display for WeeklySlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Free-standing form of [`WeeklySlot::overlaps`].
pub fn overlaps(a: &WeeklySlot, b: &WeeklySlot) -> bool {
    a.overlaps(b)
}

fn weekday_from_number(day: u8) -> Result<Weekday, SlotValidationError> {
    match day {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        other => Err(SlotValidationError::DayOutOfRange(other)),
    }
}

fn minute_of_day(time: NaiveTime) -> u16 {
    // hour <= 23 and minute <= 59, so this fits in u16.
    (time.hour() * 60 + time.minute()) as u16
}

fn time_from_minute(minute: u16) -> Result<NaiveTime, SlotValidationError> {
    if minute >= MINUTES_PER_DAY {
        return Err(SlotValidationError::MinuteOutOfRange(minute));
    }
    NaiveTime::from_hms_opt(u32::from(minute / 60), u32::from(minute % 60), 0)
        .ok_or(SlotValidationError::MinuteOutOfRange(minute))
}

/// Wire shape so deserialized slots go through the same validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawSlot {
    day_of_week: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl TryFrom<RawSlot> for WeeklySlot {
    type Error = SlotValidationError;

    fn try_from(value: RawSlot) -> Result<Self, Self::Error> {
        Self::from_day_number(value.day_of_week, value.start_time, value.end_time)
    }
}

impl From<WeeklySlot> for RawSlot {
    fn from(value: WeeklySlot) -> Self {
        Self {
            day_of_week: value.day_number(),
            start_time: value.start,
            end_time: value.end,
        }
    }
}
