//! Department command handlers

use anyhow::{anyhow, Result};

use eduflow_core::{Store, Subject};

use crate::output::Output;
use crate::prompt::confirm;

/// List departments with their subjects
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_departments(&store.list_departments())
}

/// Create a department
pub fn add(store: &mut Store, id: String, name: String, output: &Output) -> Result<()> {
    store.create_department(&id, &name)?;
    output.success(&format!("Created department {} - {}", id, name));
    Ok(())
}

pub fn rename(store: &mut Store, id: String, name: String, output: &Output) -> Result<()> {
    store.rename_department(&id, &name)?;
    output.success(&format!("Renamed department {} to {}", id, name));
    Ok(())
}

/// Delete an empty department
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let department = store
        .get_department(&id)
        .ok_or_else(|| anyhow!("Department '{}' not found", id))?;

    if output.should_prompt() {
        println!(
            "Delete department: {} - {} ({} subject(s))",
            department.id,
            department.name,
            department.subjects.len()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_department(&id)?;
    output.success(&format!("Deleted department {}", id));
    Ok(())
}

/// Add a subject to a department's catalog
pub fn add_subject(
    store: &mut Store,
    dept: String,
    code: String,
    name: String,
    semester: u8,
    output: &Output,
) -> Result<()> {
    store.add_subject(&dept, Subject::new(code.clone(), name.clone(), semester))?;
    output.success(&format!(
        "Added {} ({}) to {} semester {}",
        name, code, dept, semester
    ));
    Ok(())
}
