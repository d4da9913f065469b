//! EduFlow Core Library
//!
//! This crate provides the core functionality for EduFlow, a small school
//! administration system: students, staff and their logins, department
//! subject catalogs, generated timetables, attendance and marks.
//!
//! # Architecture
//!
//! - **Tables**: typed in-memory collections keyed by primary key
//! - **Transactions**: every mutation is undo-logged and applied atomically
//! - **Persistence**: each collection is a JSON array in a key-value store,
//!   flushed in full after every change
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! // Admit a student
//! let login = store.admit_student(form)?;
//!
//! // Generate a timetable for their class
//! store.generate_timetable(&"CSE-3-A".parse()?)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Records, keys and forms
//! - `table`: Typed tables and the `Record` trait
//! - `transaction`: Undo-logged mutations
//! - `ids`: Id, password and email generation
//! - `timetable`: Grid generation and slot assignment strategies
//! - `attendance`: Freeze window and attendance summaries
//! - `storage`: Key-value backends and collection persistence
//! - `config`: Application configuration

pub mod attendance;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod storage;
pub mod store;
pub mod table;
pub mod timetable;
pub mod transaction;

pub use attendance::{AttendanceSheet, AttendanceSummary, Clock, FixedClock, FreezePolicy, SystemClock};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use models::{
    AttendanceRecord, AttendanceStatus, ClassKey, Credentials, Day, Degree, Department,
    MarkRecord, Role, Staff, StaffForm, Student, StudentForm, Subject, TimetableSlot, User,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageStats};
pub use store::{Overview, Store};
pub use timetable::{RandomAssigner, SlotAssigner};
