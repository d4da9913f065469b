//! Attendance policy
//!
//! A sheet for a date is editable while the date is within the freeze
//! window of today (in either direction). Distances are counted in whole
//! calendar days, so a date exactly `window_days` back is still open and
//! one day further is frozen.

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::models::{AttendanceRecord, AttendanceStatus, ClassKey};

/// Percentage below which attendance is flagged
pub const LOW_ATTENDANCE_THRESHOLD: f64 = 75.0;

/// Source of "today"
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Whole days between two dates, ignoring direction
pub fn elapsed_days(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days().abs()
}

/// Decides which dates may still be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezePolicy {
    pub window_days: i64,
}

impl FreezePolicy {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    pub fn is_frozen(&self, date: NaiveDate, today: NaiveDate) -> bool {
        elapsed_days(date, today) > self.window_days
    }

    /// Fail with `FrozenRecord` if the date can no longer be edited
    pub fn check(&self, date: NaiveDate, today: NaiveDate) -> CoreResult<()> {
        let elapsed = elapsed_days(date, today);
        if elapsed > self.window_days {
            return Err(CoreError::FrozenRecord {
                date,
                elapsed_days: elapsed,
                window_days: self.window_days,
            });
        }
        Ok(())
    }
}

/// One student's line on an attendance sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRow {
    pub roll_no: String,
    pub name: String,
    pub status: AttendanceStatus,
    /// False when no record exists yet and `status` is the default
    pub recorded: bool,
}

/// Attendance for one class on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSheet {
    pub class: String,
    pub date: NaiveDate,
    /// Submissions for this sheet will be rejected
    pub frozen: bool,
    pub rows: Vec<SheetRow>,
}

impl AttendanceSheet {
    pub(crate) fn new(class: &ClassKey, date: NaiveDate, frozen: bool) -> Self {
        Self {
            class: class.to_string(),
            date,
            frozen,
            rows: Vec::new(),
        }
    }
}

/// Aggregate attendance for one student
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub roll_no: String,
    pub present: usize,
    pub total: usize,
    /// Rounded to one decimal place, 0.0 with no records
    pub percentage: f64,
    /// Newest first
    pub records: Vec<AttendanceRecord>,
}

impl AttendanceSummary {
    pub fn is_below_threshold(&self) -> bool {
        self.percentage < LOW_ATTENDANCE_THRESHOLD
    }
}

/// Summarize a student's records
pub fn summarize(roll_no: &str, records: impl IntoIterator<Item = AttendanceRecord>) -> AttendanceSummary {
    let mut records: Vec<AttendanceRecord> = records
        .into_iter()
        .filter(|r| r.roll_no == roll_no)
        .collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));

    let total = records.len();
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();

    AttendanceSummary {
        roll_no: roll_no.to_string(),
        present,
        total,
        percentage: percentage(present, total),
        records,
    }
}

fn percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = present as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
