//! Timetable command handlers

use anyhow::{bail, Result};

use eduflow_core::{ClassKey, Store};

use crate::output::{Output, OutputFormat};

/// Generate a class timetable
pub fn generate(store: &mut Store, class: ClassKey, output: &Output) -> Result<()> {
    let slots = store.generate_timetable(&class)?;
    output.success(&format!(
        "Generated timetable for {} ({} periods)",
        class,
        slots.len()
    ));
    if output.format == OutputFormat::Human {
        println!();
        let slots: Vec<_> = slots.iter().collect();
        output.print_timetable(&slots)?;
    }
    Ok(())
}

/// Show the timetable of a class or of a student's class
pub fn show(
    store: &Store,
    class: Option<ClassKey>,
    student: Option<String>,
    output: &Output,
) -> Result<()> {
    let slots = match (class, student) {
        (Some(class), _) => store.timetable_for(&class),
        (None, Some(roll_no)) => store.timetable_for_student(&roll_no)?,
        (None, None) => bail!("Give a class (DEPT-SEM-SEC) or --student"),
    };
    output.print_timetable(&slots)
}

/// Show every period a staff member teaches
pub fn for_staff(store: &Store, staff_no: String, output: &Output) -> Result<()> {
    if output.format == OutputFormat::Human {
        let classes: Vec<String> = store
            .classes_for_staff(&staff_no)
            .iter()
            .map(ToString::to_string)
            .collect();
        if !classes.is_empty() {
            println!("Classes: {}", classes.join(", "));
            println!();
        }
    }
    output.print_timetable(&store.timetable_for_staff(&staff_no))
}
