//! Marks command handlers

use anyhow::{anyhow, Result};

use eduflow_core::{MarkRecord, Store};

use crate::output::Output;

/// Record a score for a student
pub fn add(
    store: &mut Store,
    roll_no: String,
    subject: String,
    score: u8,
    semester: Option<u8>,
    output: &Output,
) -> Result<()> {
    let semester = match semester {
        Some(s) => s,
        None => {
            store
                .get_student(&roll_no)
                .ok_or_else(|| anyhow!("Student '{}' not found", roll_no))?
                .semester
        }
    };

    store.record_mark(MarkRecord {
        roll_no: roll_no.clone(),
        subject: subject.clone(),
        score,
        semester,
    })?;

    output.success(&format!(
        "Recorded {} for {} in {} (semester {})",
        score, roll_no, subject, semester
    ));
    Ok(())
}

/// Correct a recorded score
pub fn edit(
    store: &mut Store,
    roll_no: String,
    subject: String,
    score: u8,
    semester: u8,
    output: &Output,
) -> Result<()> {
    store.update_mark(MarkRecord {
        roll_no: roll_no.clone(),
        subject: subject.clone(),
        score,
        semester,
    })?;

    output.success(&format!(
        "Updated {} in {} (semester {}) to {}",
        roll_no, subject, semester, score
    ));
    Ok(())
}

pub fn delete(
    store: &mut Store,
    roll_no: String,
    subject: String,
    semester: u8,
    output: &Output,
) -> Result<()> {
    store.delete_mark(&roll_no, semester, &subject)?;
    output.success(&format!(
        "Deleted mark for {} in {} (semester {})",
        roll_no, subject, semester
    ));
    Ok(())
}

/// List a student's marks
pub fn list(store: &Store, roll_no: String, semester: Option<u8>, output: &Output) -> Result<()> {
    if store.get_student(&roll_no).is_none() {
        return Err(anyhow!("Student '{}' not found", roll_no));
    }
    output.print_marks(&store.marks_for(&roll_no, semester))
}
