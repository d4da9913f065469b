//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde::Serialize;

use eduflow_core::{
    AttendanceSheet, AttendanceSummary, CoreError, Credentials, Department, MarkRecord, Staff,
    Student, TimetableSlot, User,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a freshly issued login
    ///
    /// Shown even in quiet mode; the password is not recoverable later.
    pub fn print_credentials(&self, what: &str, credentials: &Credentials) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("✓ {} created", what);
                println!("  ID:       {}", credentials.id);
                println!("  Password: {}", credentials.password);
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "id": credentials.id,
                        "password": credentials.password
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{} {}", credentials.id, credentials.password);
            }
        }
        Ok(())
    }

    pub fn print_user(&self, user: &User) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("ID:    {}", user.id);
                println!("Name:  {}", user.name);
                println!("Role:  {}", user.role);
                println!("Email: {}", user.email);
            }
            OutputFormat::Json => {
                self.json(&serde_json::json!({
                    "id": user.id,
                    "name": user.name,
                    "role": user.role,
                    "email": user.email
                }))?;
            }
            OutputFormat::Quiet => println!("{}", user.id),
        }
        Ok(())
    }

    /// Print a single student
    pub fn print_student(&self, student: &Student) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Roll No:  {}", student.roll_no);
                println!("Name:     {}", student.name);
                println!("Degree:   {}", student.degree);
                println!("Class:    {}", student.class_key());
                println!("Email:    {}", student.email);
            }
            OutputFormat::Json => self.json(&without_password(student)?)?,
            OutputFormat::Quiet => println!("{}", student.roll_no),
        }
        Ok(())
    }

    /// Print a list of students
    pub fn print_students(&self, students: &[&Student]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if students.is_empty() {
                    println!("No students found.");
                    return Ok(());
                }
                for s in students {
                    println!(
                        "{} | {} | {} | {}",
                        s.roll_no,
                        pad(&truncate(&s.name, 24), 24),
                        pad(&s.degree.to_string(), 6),
                        s.class_key()
                    );
                }
                println!("\n{} student(s)", students.len());
            }
            OutputFormat::Json => self.json(&without_password(students)?)?,
            OutputFormat::Quiet => {
                for s in students {
                    println!("{}", s.roll_no);
                }
            }
        }
        Ok(())
    }

    /// Print a single staff member
    pub fn print_staff_member(&self, staff: &Staff) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Staff No:       {}", staff.staff_no);
                println!("Name:           {}", staff.name);
                println!("Department:     {}", staff.dept);
                println!("Specialization: {}", or_dash(&staff.specialization));
                println!("Email:          {}", staff.email);
            }
            OutputFormat::Json => self.json(&without_password(staff)?)?,
            OutputFormat::Quiet => println!("{}", staff.staff_no),
        }
        Ok(())
    }

    /// Print a list of staff
    pub fn print_staff(&self, staff: &[&Staff]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if staff.is_empty() {
                    println!("No staff found.");
                    return Ok(());
                }
                for s in staff {
                    println!(
                        "{} | {} | {} | {}",
                        s.staff_no,
                        pad(&truncate(&s.name, 24), 24),
                        pad(&s.dept, 5),
                        truncate(or_dash(&s.specialization), 40)
                    );
                }
                println!("\n{} staff", staff.len());
            }
            OutputFormat::Json => self.json(&without_password(staff)?)?,
            OutputFormat::Quiet => {
                for s in staff {
                    println!("{}", s.staff_no);
                }
            }
        }
        Ok(())
    }

    /// Print departments with their subject catalogs
    pub fn print_departments(&self, departments: &[&Department]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                for dept in departments {
                    println!("{} - {}", dept.id, dept.name);
                    let mut subjects = dept.subjects.clone();
                    subjects.sort_by_key(|s| s.semester);
                    for subject in subjects {
                        println!(
                            "    sem {} | {} | {}",
                            subject.semester, subject.code, subject.name
                        );
                    }
                }
                println!("\n{} department(s)", departments.len());
            }
            OutputFormat::Json => self.json(departments)?,
            OutputFormat::Quiet => {
                for dept in departments {
                    println!("{}", dept.id);
                }
            }
        }
        Ok(())
    }

    /// Print timetable slots as a list, one line per period
    pub fn print_timetable(&self, slots: &[&TimetableSlot]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if slots.is_empty() {
                    println!("No timetable found.");
                    return Ok(());
                }
                for slot in slots {
                    println!(
                        "{} P{} | {} | {} | {} ({})",
                        slot.day.short(),
                        slot.period,
                        slot.class_key(),
                        pad(&truncate(&slot.subject, 28), 28),
                        slot.staff,
                        slot.staff_id
                    );
                }
                println!("\n{} slot(s)", slots.len());
            }
            OutputFormat::Json => self.json(slots)?,
            OutputFormat::Quiet => {
                for slot in slots {
                    println!("{}\t{}\t{}", slot.day, slot.period, slot.subject);
                }
            }
        }
        Ok(())
    }

    pub fn print_sheet(&self, sheet: &AttendanceSheet) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Attendance for {} on {}", sheet.class, sheet.date);
                if sheet.frozen {
                    println!("(frozen: this sheet can no longer be changed)");
                }
                println!();
                if sheet.rows.is_empty() {
                    println!("No students in this class.");
                    return Ok(());
                }
                for row in &sheet.rows {
                    let marker = if row.recorded { "" } else { " (default)" };
                    println!(
                        "{} | {} | {}{}",
                        row.roll_no,
                        pad(&truncate(&row.name, 24), 24),
                        row.status,
                        marker
                    );
                }
            }
            OutputFormat::Json => self.json(sheet)?,
            OutputFormat::Quiet => {
                for row in &sheet.rows {
                    println!("{}\t{}", row.roll_no, row.status);
                }
            }
        }
        Ok(())
    }

    pub fn print_summary(&self, summary: &AttendanceSummary) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let flag = if summary.is_below_threshold() {
                    "  ⚠ below 75%"
                } else {
                    ""
                };
                println!(
                    "{}: {}/{} present ({:.1}%){}",
                    summary.roll_no, summary.present, summary.total, summary.percentage, flag
                );
                if !summary.records.is_empty() {
                    println!();
                    for record in &summary.records {
                        println!("  {} {}", record.date, record.status);
                    }
                }
            }
            OutputFormat::Json => self.json(summary)?,
            OutputFormat::Quiet => println!("{:.1}", summary.percentage),
        }
        Ok(())
    }

    pub fn print_marks(&self, marks: &[&MarkRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if marks.is_empty() {
                    println!("No marks found.");
                    return Ok(());
                }
                for mark in marks {
                    println!(
                        "sem {} | {} | {:>3}",
                        mark.semester,
                        pad(&truncate(&mark.subject, 30), 30),
                        mark.score
                    );
                }
                println!("\n{} mark(s)", marks.len());
            }
            OutputFormat::Json => self.json(marks)?,
            OutputFormat::Quiet => {
                for mark in marks {
                    println!("{}\t{}", mark.subject, mark.score);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report a failed command
    ///
    /// Errors always go out, quiet mode included.
    pub fn error(&self, error: &anyhow::Error) {
        let storage = error.downcast_ref::<CoreError>().and_then(|e| match e {
            CoreError::Storage(storage) => Some(storage),
            _ => None,
        });
        let suggestion = storage.and_then(|s| s.recovery_suggestion());

        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "message": format!("{:#}", error),
                        "suggestion": suggestion,
                        "recoverable": storage.map(|s| s.is_recoverable())
                    })
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                eprintln!("✗ {:#}", error);
                if let Some(hint) = suggestion {
                    eprintln!("  {}", hint);
                }
            }
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

/// JSON view of a record or list of records with passwords left out
///
/// Passwords are shown once, when the login is created.
fn without_password<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(value)?;
    match &mut value {
        serde_json::Value::Object(map) => {
            map.remove("password");
        }
        serde_json::Value::Array(items) => {
            for item in items {
                if let serde_json::Value::Object(map) = item {
                    map.remove("password");
                }
            }
        }
        _ => {}
    }
    Ok(value)
}
