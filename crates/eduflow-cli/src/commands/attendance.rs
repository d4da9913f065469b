//! Attendance command handlers

use anyhow::{bail, Result};
use chrono::NaiveDate;

use eduflow_core::{AttendanceStatus, ClassKey, Store};

use crate::output::Output;

/// Show a class sheet for a date
pub fn sheet(store: &Store, class: ClassKey, date: Option<NaiveDate>, output: &Output) -> Result<()> {
    let date = date.unwrap_or_else(|| store.today());
    output.print_sheet(&store.attendance_sheet(&class, date))
}

/// Record statuses given as ROLL=STATUS
pub fn set(
    store: &mut Store,
    entries: Vec<String>,
    date: Option<NaiveDate>,
    output: &Output,
) -> Result<()> {
    let date = date.unwrap_or_else(|| store.today());
    let entries = entries
        .iter()
        .map(|e| parse_entry(e))
        .collect::<Result<Vec<_>>>()?;

    let created = store.submit_attendance(date, &entries)?;
    output.success(&format!(
        "Saved attendance for {} student(s) on {} ({} new, {} updated)",
        entries.len(),
        date,
        created,
        entries.len() - created
    ));
    Ok(())
}

/// Show a student's attendance percentage
pub fn report(store: &Store, roll_no: String, output: &Output) -> Result<()> {
    let summary = store.attendance_summary(&roll_no)?;
    output.print_summary(&summary)
}

/// Parse `STU0001=absent` (also `present`, `p`, `a`)
fn parse_entry(entry: &str) -> Result<(String, AttendanceStatus)> {
    let Some((roll_no, status)) = entry.split_once('=') else {
        bail!("Expected ROLL=STATUS, got {:?}", entry);
    };
    let roll_no = roll_no.trim();
    if roll_no.is_empty() {
        bail!("Missing roll number in {:?}", entry);
    }
    let status = status.trim().parse::<AttendanceStatus>().map_err(anyhow::Error::msg)?;
    Ok((roll_no.to_string(), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        assert_eq!(
            parse_entry("STU0001=absent").unwrap(),
            ("STU0001".to_string(), AttendanceStatus::Absent)
        );
        assert_eq!(
            parse_entry(" STU0002 = P ").unwrap(),
            ("STU0002".to_string(), AttendanceStatus::Present)
        );
        assert!(parse_entry("STU0001").is_err());
        assert!(parse_entry("=absent").is_err());
        assert!(parse_entry("STU0001=late").is_err());
    }
}
