//! Staff command handlers

use anyhow::{anyhow, Context, Result};

use eduflow_core::{StaffForm, Store};

use crate::output::Output;
use crate::prompt::confirm;

/// Fields to change on `staff edit`; unset fields keep their value
pub struct StaffEdit {
    pub name: Option<String>,
    pub dept: Option<String>,
    pub specialization: Option<String>,
}

/// Hire a staff member and print their login
pub fn add(store: &mut Store, form: StaffForm, output: &Output) -> Result<()> {
    let credentials = store.hire_staff(form)?;
    output.print_credentials("Staff member", &credentials)
}

/// List all staff, optionally one department
pub fn list(store: &Store, dept: Option<String>, output: &Output) -> Result<()> {
    let mut staff = store.list_staff();
    if let Some(ref d) = dept {
        staff.retain(|s| s.dept.eq_ignore_ascii_case(d));
    }
    output.print_staff(&staff)
}

/// Show a single staff member
pub fn show(store: &Store, staff_no: String, output: &Output) -> Result<()> {
    let staff = store
        .get_staff(&staff_no)
        .ok_or_else(|| anyhow!("Staff '{}' not found", staff_no))?;
    output.print_staff_member(staff)
}

/// Update a staff member's details
pub fn edit(store: &mut Store, staff_no: String, edit: StaffEdit, output: &Output) -> Result<()> {
    let current = store
        .get_staff(&staff_no)
        .ok_or_else(|| anyhow!("Staff '{}' not found", staff_no))?;

    let form = StaffForm {
        name: edit.name.unwrap_or_else(|| current.name.clone()),
        dept: edit.dept.unwrap_or_else(|| current.dept.clone()),
        specialization: edit
            .specialization
            .unwrap_or_else(|| current.specialization.clone()),
    };

    store.update_staff(&staff_no, form)?;
    output.success(&format!("Updated staff {}", staff_no));
    Ok(())
}

/// Delete a staff member
pub fn delete(store: &mut Store, staff_no: String, output: &Output) -> Result<()> {
    let staff = store
        .get_staff(&staff_no)
        .ok_or_else(|| anyhow!("Staff '{}' not found", staff_no))?;

    if output.should_prompt() {
        println!("Delete staff: {} - {}", staff.staff_no, staff.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_staff(&staff_no)
        .context("Failed to delete staff")?;

    output.success(&format!("Deleted staff {}", staff_no));
    Ok(())
}

/// Search staff
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let staff = store.search_staff(&query);
    output.print_staff(&staff)
}
