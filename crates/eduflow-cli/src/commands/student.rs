//! Student command handlers

use anyhow::{anyhow, Context, Result};

use eduflow_core::{ClassKey, Degree, Store, StudentForm};

use crate::output::Output;
use crate::prompt::confirm;

/// Fields to change on `student edit`; unset fields keep their value
pub struct StudentEdit {
    pub name: Option<String>,
    pub degree: Option<Degree>,
    pub dept: Option<String>,
    pub semester: Option<u8>,
    pub section: Option<String>,
}

impl StudentEdit {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.degree.is_none()
            && self.dept.is_none()
            && self.semester.is_none()
            && self.section.is_none()
    }
}

/// Admit a student and print their login
pub fn add(store: &mut Store, form: StudentForm, output: &Output) -> Result<()> {
    let credentials = store.admit_student(form)?;
    output.print_credentials("Student", &credentials)
}

/// List all students, or one class
pub fn list(store: &Store, class: Option<ClassKey>, output: &Output) -> Result<()> {
    let students = match class {
        Some(ref c) => store.class_roster(c),
        None => store.list_students(),
    };
    output.print_students(&students)
}

/// Show a single student
pub fn show(store: &Store, roll_no: String, output: &Output) -> Result<()> {
    let student = store
        .get_student(&roll_no)
        .ok_or_else(|| anyhow!("Student '{}' not found", roll_no))?;
    output.print_student(student)
}

/// Update a student's details
pub fn edit(store: &mut Store, roll_no: String, edit: StudentEdit, output: &Output) -> Result<()> {
    if edit.is_empty() {
        output.message("Nothing to change.");
        return Ok(());
    }

    let current = store
        .get_student(&roll_no)
        .ok_or_else(|| anyhow!("Student '{}' not found", roll_no))?;

    let form = StudentForm {
        name: edit.name.unwrap_or_else(|| current.name.clone()),
        degree: edit.degree.unwrap_or(current.degree),
        dept: edit.dept.unwrap_or_else(|| current.dept.clone()),
        semester: edit.semester.unwrap_or(current.semester),
        section: edit.section.unwrap_or_else(|| current.section.clone()),
    };

    store.update_student(&roll_no, form)?;
    output.success(&format!("Updated student {}", roll_no));
    Ok(())
}

/// Delete a student
pub fn delete(store: &mut Store, roll_no: String, output: &Output) -> Result<()> {
    let student = store
        .get_student(&roll_no)
        .ok_or_else(|| anyhow!("Student '{}' not found", roll_no))?;

    // Confirm deletion
    if output.should_prompt() {
        println!("Delete student: {} - {}", student.roll_no, student.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_student(&roll_no)
        .context("Failed to delete student")?;

    output.success(&format!("Deleted student {}", roll_no));
    Ok(())
}

/// Search students
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let students = store.search_students(&query);
    output.print_students(&students)
}
