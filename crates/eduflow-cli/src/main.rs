//! EduFlow CLI
//!
//! Command-line interface for EduFlow - students, staff, timetables and
//! attendance.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eduflow_core::{ClassKey, Config, Degree, Store};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "eduflow")]
#[command(about = "EduFlow - school records, timetables and attendance")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a user's credentials
    Login {
        /// User ID (e.g. ADM001, STU0001)
        id: String,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Change a user's password
    Passwd {
        /// User ID
        id: String,
        /// Current password (prompted if omitted)
        #[arg(long)]
        current: Option<String>,
        /// New password, at least 4 characters (prompted if omitted)
        #[arg(long)]
        new: Option<String>,
    },
    /// Manage students
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },
    /// Manage staff
    Staff {
        #[command(subcommand)]
        command: StaffCommands,
    },
    /// Manage departments and subjects
    Dept {
        #[command(subcommand)]
        command: DeptCommands,
    },
    /// Generate and view timetables
    Timetable {
        #[command(subcommand)]
        command: TimetableCommands,
    },
    /// Record and review attendance
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },
    /// Record and review marks
    Marks {
        #[command(subcommand)]
        command: MarksCommands,
    },
    /// Show counts and storage usage
    Status,
    /// Erase all data and restore the seeded admin and departments
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Admit a new student
    #[command(alias = "create")]
    Add {
        /// Full name
        name: String,
        /// Degree (B.Tech, M.Tech, B.Sc)
        #[arg(long)]
        degree: Degree,
        /// Department ID
        #[arg(long)]
        dept: String,
        /// Semester (1-8)
        #[arg(long)]
        semester: u8,
        /// Section
        #[arg(long)]
        section: String,
    },
    /// List students
    #[command(alias = "ls")]
    List {
        /// Only this class (DEPT-SEM-SEC)
        #[arg(long)]
        class: Option<ClassKey>,
    },
    /// Show a student
    Show {
        /// Roll number
        roll_no: String,
    },
    /// Change a student's details
    Edit {
        /// Roll number
        roll_no: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        degree: Option<Degree>,
        #[arg(long)]
        dept: Option<String>,
        #[arg(long)]
        semester: Option<u8>,
        #[arg(long)]
        section: Option<String>,
    },
    /// Delete a student and their login
    #[command(alias = "delete")]
    Rm {
        /// Roll number
        roll_no: String,
    },
    /// Search by roll number, name, department or section
    Search {
        /// Search query
        query: String,
    },
}

#[derive(Subcommand)]
enum StaffCommands {
    /// Hire a new staff member
    #[command(alias = "create")]
    Add {
        /// Full name
        name: String,
        /// Department ID
        #[arg(long)]
        dept: String,
        /// Subjects this person teaches (free text)
        #[arg(long, default_value = "")]
        specialization: String,
    },
    /// List staff
    #[command(alias = "ls")]
    List {
        /// Only this department
        #[arg(long)]
        dept: Option<String>,
    },
    /// Show a staff member
    Show {
        /// Staff number
        staff_no: String,
    },
    /// Change a staff member's details
    Edit {
        /// Staff number
        staff_no: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dept: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
    },
    /// Delete a staff member and their login
    #[command(alias = "delete")]
    Rm {
        /// Staff number
        staff_no: String,
    },
    /// Search by staff number, name, department or specialization
    Search {
        /// Search query
        query: String,
    },
}

#[derive(Subcommand)]
enum DeptCommands {
    /// List departments and their subjects
    #[command(alias = "ls")]
    List,
    /// Create a department
    Add {
        /// Department ID (e.g. MECH)
        id: String,
        /// Department name
        name: String,
    },
    /// Rename a department
    Rename {
        /// Department ID
        id: String,
        /// New name
        name: String,
    },
    /// Delete a department that has no students or staff
    #[command(alias = "delete")]
    Rm {
        /// Department ID
        id: String,
    },
    /// Add a subject to a department
    Subject {
        /// Department ID
        dept: String,
        /// Subject code
        code: String,
        /// Subject name
        name: String,
        /// Semester (1-8)
        #[arg(long)]
        semester: u8,
    },
}

#[derive(Subcommand)]
enum TimetableCommands {
    /// Generate a new timetable for a class, replacing the old one
    Generate {
        /// Class (DEPT-SEM-SEC)
        class: ClassKey,
    },
    /// Show a class timetable
    Show {
        /// Class (DEPT-SEM-SEC)
        #[arg(required_unless_present = "student")]
        class: Option<ClassKey>,
        /// Show the timetable of this student's class instead
        #[arg(long, conflicts_with = "class")]
        student: Option<String>,
    },
    /// Show what a staff member teaches
    Staff {
        /// Staff number
        staff_no: String,
    },
}

#[derive(Subcommand)]
enum AttendanceCommands {
    /// Show the attendance sheet of a class
    Sheet {
        /// Class (DEPT-SEM-SEC)
        class: ClassKey,
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark students present or absent
    Set {
        /// Entries as ROLL=STATUS, e.g. STU0001=absent
        #[arg(required = true)]
        entries: Vec<String>,
        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show a student's attendance percentage and history
    Report {
        /// Roll number
        roll_no: String,
    },
}

#[derive(Subcommand)]
enum MarksCommands {
    /// Record a score
    Add {
        /// Roll number
        roll_no: String,
        /// Subject name
        subject: String,
        /// Score (0-100)
        score: u8,
        /// Semester (default the student's current semester)
        #[arg(long)]
        semester: Option<u8>,
    },
    /// Correct a recorded score
    Edit {
        /// Roll number
        roll_no: String,
        /// Subject name
        subject: String,
        /// New score (0-100)
        score: u8,
        /// Semester the mark was recorded for
        #[arg(long)]
        semester: u8,
    },
    /// Delete a recorded score
    #[command(alias = "delete")]
    Rm {
        /// Roll number
        roll_no: String,
        /// Subject name
        subject: String,
        /// Semester the mark was recorded for
        #[arg(long)]
        semester: u8,
    },
    /// List a student's marks
    #[command(alias = "ls")]
    List {
        /// Roll number
        roll_no: String,
        /// Only this semester
        #[arg(long)]
        semester: Option<u8>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, freeze_window_days, email_domain, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands work even when the stored config is broken
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key.clone(), value.clone(), config_path, output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config.log_level);

    let mut store = Store::open_with_config(config)?;

    match cli.command {
        Commands::Login { id, password } => commands::auth::login(&store, id, password, output),
        Commands::Passwd { id, current, new } => {
            commands::auth::passwd(&mut store, id, current, new, output)
        }
        Commands::Student { command } => handle_student_command(command, &mut store, output),
        Commands::Staff { command } => handle_staff_command(command, &mut store, output),
        Commands::Dept { command } => handle_dept_command(command, &mut store, output),
        Commands::Timetable { command } => handle_timetable_command(command, &mut store, output),
        Commands::Attendance { command } => {
            handle_attendance_command(command, &mut store, output)
        }
        Commands::Marks { command } => handle_marks_command(command, &mut store, output),
        Commands::Status => commands::status::show(&store, output),
        Commands::Reset { yes } => commands::status::reset(&mut store, yes, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Install the stderr log subscriber
///
/// `EDUFLOW_LOG` wins over the configured level when it parses.
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_env("EDUFLOW_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "eduflow_core={level},eduflow_cli={level}",
            level = log_level
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_student_command(command: StudentCommands, store: &mut Store, output: &Output) -> Result<()> {
    use commands::student;

    match command {
        StudentCommands::Add {
            name,
            degree,
            dept,
            semester,
            section,
        } => student::add(
            store,
            eduflow_core::StudentForm {
                name,
                degree,
                dept,
                semester,
                section,
            },
            output,
        ),
        StudentCommands::List { class } => student::list(store, class, output),
        StudentCommands::Show { roll_no } => student::show(store, roll_no, output),
        StudentCommands::Edit {
            roll_no,
            name,
            degree,
            dept,
            semester,
            section,
        } => student::edit(
            store,
            roll_no,
            student::StudentEdit {
                name,
                degree,
                dept,
                semester,
                section,
            },
            output,
        ),
        StudentCommands::Rm { roll_no } => student::delete(store, roll_no, output),
        StudentCommands::Search { query } => student::search(store, query, output),
    }
}

fn handle_staff_command(command: StaffCommands, store: &mut Store, output: &Output) -> Result<()> {
    use commands::staff;

    match command {
        StaffCommands::Add {
            name,
            dept,
            specialization,
        } => staff::add(
            store,
            eduflow_core::StaffForm {
                name,
                dept,
                specialization,
            },
            output,
        ),
        StaffCommands::List { dept } => staff::list(store, dept, output),
        StaffCommands::Show { staff_no } => staff::show(store, staff_no, output),
        StaffCommands::Edit {
            staff_no,
            name,
            dept,
            specialization,
        } => staff::edit(
            store,
            staff_no,
            staff::StaffEdit {
                name,
                dept,
                specialization,
            },
            output,
        ),
        StaffCommands::Rm { staff_no } => staff::delete(store, staff_no, output),
        StaffCommands::Search { query } => staff::search(store, query, output),
    }
}

fn handle_dept_command(command: DeptCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        DeptCommands::List => commands::dept::list(store, output),
        DeptCommands::Add { id, name } => commands::dept::add(store, id, name, output),
        DeptCommands::Rename { id, name } => commands::dept::rename(store, id, name, output),
        DeptCommands::Rm { id } => commands::dept::delete(store, id, output),
        DeptCommands::Subject {
            dept,
            code,
            name,
            semester,
        } => commands::dept::add_subject(store, dept, code, name, semester, output),
    }
}

fn handle_timetable_command(
    command: TimetableCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        TimetableCommands::Generate { class } => commands::timetable::generate(store, class, output),
        TimetableCommands::Show { class, student } => {
            commands::timetable::show(store, class, student, output)
        }
        TimetableCommands::Staff { staff_no } => {
            commands::timetable::for_staff(store, staff_no, output)
        }
    }
}

fn handle_attendance_command(
    command: AttendanceCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        AttendanceCommands::Sheet { class, date } => {
            commands::attendance::sheet(store, class, date, output)
        }
        AttendanceCommands::Set { entries, date } => {
            commands::attendance::set(store, entries, date, output)
        }
        AttendanceCommands::Report { roll_no } => {
            commands::attendance::report(store, roll_no, output)
        }
    }
}

fn handle_marks_command(command: MarksCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        MarksCommands::Add {
            roll_no,
            subject,
            score,
            semester,
        } => commands::marks::add(store, roll_no, subject, score, semester, output),
        MarksCommands::Edit {
            roll_no,
            subject,
            score,
            semester,
        } => commands::marks::edit(store, roll_no, subject, score, semester, output),
        MarksCommands::Rm {
            roll_no,
            subject,
            semester,
        } => commands::marks::delete(store, roll_no, subject, semester, output),
        MarksCommands::List { roll_no, semester } => {
            commands::marks::list(store, roll_no, semester, output)
        }
    }
}
