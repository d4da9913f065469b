//! Unified storage interface
//!
//! The `Store` owns the in-memory tables and the persistence layer. Every
//! mutation runs inside a `Transaction` and the full snapshot is flushed
//! before the call returns; if any step or the flush fails, the tables are
//! left exactly as they were.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let login = store.admit_student(form)?;
//! store.generate_timetable(&"CSE-3-A".parse()?)?;
//! store.set_attendance_status(&login.id, today, AttendanceStatus::Absent)?;
//! ```

use std::collections::BTreeSet;

use anyhow::Context;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attendance::{
    summarize, AttendanceSheet, AttendanceSummary, Clock, FreezePolicy, SheetRow, SystemClock,
};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::ids::{generate_password, institutional_email, STAFF_PREFIX, STUDENT_PREFIX};
use crate::models::{
    AttendanceKey, AttendanceRecord, AttendanceStatus, ClassKey, Credentials, Department, MarkKey,
    MarkRecord, Role, Staff, StaffForm, Student, StudentForm, Subject, TimetableSlot, User,
};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, Persistence, StorageStats};
use crate::table::{Record, Tables};
use crate::timetable::{generate_grid, RandomAssigner, SlotAssigner};
use crate::transaction::Transaction;

/// Shortest password `change_password` accepts
pub const MIN_PASSWORD_LEN: usize = 4;

/// Highest semester number
pub const MAX_SEMESTER: u8 = 8;

/// Dashboard counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub students: usize,
    pub staff: usize,
    pub departments: usize,
    pub subjects: usize,
}

/// Unified storage interface for EduFlow
pub struct Store {
    tables: Tables,
    persistence: Persistence,
    config: Config,
    freeze: FreezePolicy,
    clock: Box<dyn Clock>,
    rng: StdRng,
}

impl Store {
    /// Open the store in the configured data directory
    ///
    /// On first run the seeded admin and departments are written out.
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> anyhow::Result<Self> {
        let backend = FileStore::open(&config.data_dir)
            .with_context(|| format!("Failed to open data directory {:?}", config.data_dir))?;
        Self::with_backend(Box::new(backend), config).context("Failed to load stored collections")
    }

    /// Open the store over any key-value backend
    pub fn with_backend(backend: Box<dyn KeyValueStore>, config: Config) -> CoreResult<Self> {
        let mut persistence = Persistence::new(backend);
        let tables = persistence.load()?;

        if !persistence.exists()? {
            persistence.save(&tables)?;
            info!("Initialized new data store");
        }

        Ok(Self {
            tables,
            persistence,
            freeze: FreezePolicy::new(config.freeze_window_days),
            config,
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
        })
    }

    /// A store that lives only in memory
    pub fn in_memory() -> CoreResult<Self> {
        Self::with_backend(Box::new(MemoryStore::new()), Config::default())
    }

    /// Replace the clock used for the attendance freeze rule
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Seed the password generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Today's date according to the store's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ==================== User Operations ====================

    /// Exact-match login
    pub fn authenticate(&self, id: &str, password: &str) -> CoreResult<&User> {
        match self.tables.users.get(&id.to_string()) {
            Some(user) if user.password == password => {
                debug!("Authenticated {} as {}", user.id, user.role);
                Ok(user)
            }
            _ => {
                warn!("Failed login attempt for {:?}", id);
                Err(CoreError::AuthFailure)
            }
        }
    }

    /// Set a new password for a user and its student or staff record
    pub fn change_password(&mut self, id: &str, new_password: &str) -> CoreResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::invalid(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        let id = id.to_string();
        let password = new_password.to_string();
        self.write(|tx| {
            let role = tx.require::<User>(&id)?.role;
            let set = password.clone();
            tx.update::<User>(&id, |u| u.password = set)?;
            match role {
                Role::Student if tx.get::<Student>(&id).is_some() => {
                    tx.update::<Student>(&id, |s| s.password = password)?;
                }
                Role::Staff if tx.get::<Staff>(&id).is_some() => {
                    tx.update::<Staff>(&id, |s| s.password = password)?;
                }
                _ => {}
            }
            Ok(())
        })?;

        info!("Changed password for {}", id);
        Ok(())
    }

    pub fn list_users(&self) -> Vec<&User> {
        self.tables.users.iter().collect()
    }

    pub fn get_user(&self, id: &str) -> Option<&User> {
        self.tables.users.get(&id.to_string())
    }

    // ==================== Student Operations ====================

    /// Admit a student and create their login
    pub fn admit_student(&mut self, form: StudentForm) -> CoreResult<Credentials> {
        let form = validate_student_form(form)?;
        let password = generate_password(&mut self.rng);
        let domain = self.config.email_domain.clone();

        let credentials = self.write(|tx| {
            tx.require::<Department>(&form.dept)?;
            let roll_no = tx.mint_id(STUDENT_PREFIX);
            let email = institutional_email(&roll_no, &domain);

            tx.insert(Student {
                roll_no: roll_no.clone(),
                name: form.name.clone(),
                degree: form.degree,
                dept: form.dept,
                semester: form.semester,
                section: form.section,
                email: email.clone(),
                password: password.clone(),
                role: Role::Student,
            })?;
            tx.insert(User {
                id: roll_no.clone(),
                name: form.name,
                role: Role::Student,
                password: password.clone(),
                email,
            })?;

            Ok(Credentials {
                id: roll_no,
                password,
            })
        })?;

        info!("Admitted student {}", credentials.id);
        Ok(credentials)
    }

    /// Replace a student's editable fields, keeping roll number and password
    pub fn update_student(&mut self, roll_no: &str, form: StudentForm) -> CoreResult<()> {
        let form = validate_student_form(form)?;
        let roll_no = roll_no.to_string();

        self.write(|tx| {
            tx.require::<Department>(&form.dept)?;
            let name = form.name.clone();
            tx.update::<Student>(&roll_no, |s| {
                s.name = form.name;
                s.degree = form.degree;
                s.dept = form.dept;
                s.semester = form.semester;
                s.section = form.section;
            })?;

            let email = tx.require::<Student>(&roll_no)?.email.clone();
            if tx.get::<User>(&roll_no).is_some() {
                tx.update::<User>(&roll_no, |u| {
                    u.name = name;
                    u.email = email;
                })?;
            }
            Ok(())
        })?;

        info!("Updated student {}", roll_no);
        Ok(())
    }

    /// Remove a student together with their login
    pub fn delete_student(&mut self, roll_no: &str) -> CoreResult<()> {
        let roll_no = roll_no.to_string();
        self.write(|tx| {
            tx.remove::<Student>(&roll_no)?;
            tx.remove::<User>(&roll_no)
        })?;

        info!("Deleted student {}", roll_no);
        Ok(())
    }

    pub fn list_students(&self) -> Vec<&Student> {
        self.tables.students.iter().collect()
    }

    pub fn get_student(&self, roll_no: &str) -> Option<&Student> {
        self.tables.students.get(&roll_no.to_string())
    }

    /// Case-insensitive match on roll number, name, department or section
    pub fn search_students(&self, query: &str) -> Vec<&Student> {
        let needle = query.to_lowercase();
        self.tables
            .students
            .iter()
            .filter(|s| {
                [&s.roll_no, &s.name, &s.dept, &s.section]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Students of one class, by roll number
    pub fn class_roster(&self, class: &ClassKey) -> Vec<&Student> {
        self.tables
            .students
            .iter()
            .filter(|s| s.class_key() == *class)
            .collect()
    }

    // ==================== Staff Operations ====================

    /// Hire a staff member and create their login
    pub fn hire_staff(&mut self, form: StaffForm) -> CoreResult<Credentials> {
        let form = validate_staff_form(form)?;
        let password = generate_password(&mut self.rng);
        let domain = self.config.email_domain.clone();

        let credentials = self.write(|tx| {
            tx.require::<Department>(&form.dept)?;
            let staff_no = tx.mint_id(STAFF_PREFIX);
            let email = institutional_email(&staff_no, &domain);

            tx.insert(Staff {
                staff_no: staff_no.clone(),
                name: form.name.clone(),
                dept: form.dept,
                specialization: form.specialization,
                email: email.clone(),
                password: password.clone(),
                role: Role::Staff,
            })?;
            tx.insert(User {
                id: staff_no.clone(),
                name: form.name,
                role: Role::Staff,
                password: password.clone(),
                email,
            })?;

            Ok(Credentials {
                id: staff_no,
                password,
            })
        })?;

        info!("Hired staff {}", credentials.id);
        Ok(credentials)
    }

    /// Replace a staff member's editable fields
    pub fn update_staff(&mut self, staff_no: &str, form: StaffForm) -> CoreResult<()> {
        let form = validate_staff_form(form)?;
        let staff_no = staff_no.to_string();

        self.write(|tx| {
            tx.require::<Department>(&form.dept)?;
            let name = form.name.clone();
            tx.update::<Staff>(&staff_no, |s| {
                s.name = form.name;
                s.dept = form.dept;
                s.specialization = form.specialization;
            })?;

            let email = tx.require::<Staff>(&staff_no)?.email.clone();
            if tx.get::<User>(&staff_no).is_some() {
                tx.update::<User>(&staff_no, |u| {
                    u.name = name;
                    u.email = email;
                })?;
            }
            Ok(())
        })?;

        info!("Updated staff {}", staff_no);
        Ok(())
    }

    /// Remove a staff member together with their login
    ///
    /// Timetable slots keep the name they were generated with.
    pub fn delete_staff(&mut self, staff_no: &str) -> CoreResult<()> {
        let staff_no = staff_no.to_string();
        self.write(|tx| {
            tx.remove::<Staff>(&staff_no)?;
            tx.remove::<User>(&staff_no)
        })?;

        info!("Deleted staff {}", staff_no);
        Ok(())
    }

    pub fn list_staff(&self) -> Vec<&Staff> {
        self.tables.staff.iter().collect()
    }

    pub fn get_staff(&self, staff_no: &str) -> Option<&Staff> {
        self.tables.staff.get(&staff_no.to_string())
    }

    /// Case-insensitive match on staff number, name, department or specialization
    pub fn search_staff(&self, query: &str) -> Vec<&Staff> {
        let needle = query.to_lowercase();
        self.tables
            .staff
            .iter()
            .filter(|s| {
                [&s.staff_no, &s.name, &s.dept, &s.specialization]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    // ==================== Department Operations ====================

    pub fn create_department(&mut self, id: &str, name: &str) -> CoreResult<()> {
        let id = required("department id", id)?;
        let name = required("department name", name)?;

        let department = Department::new(id.clone(), name);
        self.write(|tx| tx.insert(department))?;

        info!("Created department {}", id);
        Ok(())
    }

    pub fn list_departments(&self) -> Vec<&Department> {
        self.tables.departments.iter().collect()
    }

    pub fn get_department(&self, id: &str) -> Option<&Department> {
        self.tables.departments.get(&id.to_string())
    }

    pub fn rename_department(&mut self, id: &str, name: &str) -> CoreResult<()> {
        let name = required("department name", name)?;
        let id = id.to_string();
        self.write(|tx| tx.update::<Department>(&id, |d| d.name = name))?;

        info!("Renamed department {}", id);
        Ok(())
    }

    /// Remove a department with no students or staff, along with its timetables
    pub fn delete_department(&mut self, id: &str) -> CoreResult<()> {
        let id = id.to_string();
        let in_use = self.tables.students.iter().any(|s| s.dept == id)
            || self.tables.staff.iter().any(|s| s.dept == id);
        if in_use {
            return Err(CoreError::invalid(
                "department",
                format!("{} still has students or staff", id),
            ));
        }

        let slots = self.write(|tx| {
            tx.remove::<Department>(&id)?;
            Ok(tx.retain::<TimetableSlot>(|slot| slot.dept != id))
        })?;

        info!("Deleted department {} ({} timetable slot(s))", id, slots);
        Ok(())
    }

    /// Append a subject to a department's catalog
    ///
    /// Subject codes are unique within a department.
    pub fn add_subject(&mut self, dept_id: &str, subject: Subject) -> CoreResult<()> {
        let subject = Subject {
            code: required("subject code", &subject.code)?,
            name: required("subject name", &subject.name)?,
            semester: check_semester(subject.semester)?,
        };
        let dept_id = dept_id.to_string();
        let code = subject.code.clone();

        self.write(|tx| {
            let department = tx.require::<Department>(&dept_id)?;
            if department.subjects.iter().any(|s| s.code == subject.code) {
                return Err(CoreError::duplicate(
                    "Subject",
                    format!("{} in {}", subject.code, dept_id),
                ));
            }
            tx.update::<Department>(&dept_id, |d| d.subjects.push(subject))
        })?;

        info!("Added subject {} to {}", code, dept_id);
        Ok(())
    }

    /// Subjects a department offers in one semester
    pub fn subjects_for(&self, dept_id: &str, semester: u8) -> CoreResult<Vec<Subject>> {
        self.require_department(dept_id)
            .map(|d| d.subjects_for(semester))
    }

    fn require_department(&self, dept_id: &str) -> CoreResult<&Department> {
        self.tables
            .departments
            .get(&dept_id.to_string())
            .ok_or_else(|| CoreError::not_found("Department", dept_id))
    }

    // ==================== Timetable Operations ====================

    /// Generate a fresh random grid for a class, replacing any existing one
    pub fn generate_timetable(&mut self, class: &ClassKey) -> CoreResult<Vec<TimetableSlot>> {
        self.generate_timetable_with(class, &mut RandomAssigner::new())
    }

    /// Generate a grid using a specific assignment strategy
    pub fn generate_timetable_with(
        &mut self,
        class: &ClassKey,
        assigner: &mut dyn SlotAssigner,
    ) -> CoreResult<Vec<TimetableSlot>> {
        check_semester(class.sem)?;
        required("section", &class.sec)?;

        let subjects = self.require_department(&class.dept)?.subjects_for(class.sem);
        let staff: Vec<Staff> = self
            .tables
            .staff
            .iter()
            .filter(|s| s.dept == class.dept)
            .cloned()
            .collect();

        let grid = generate_grid(class, &subjects, &staff, assigner)?;

        let replaced = self.write(|tx| {
            let replaced = tx.retain::<TimetableSlot>(|slot| slot.class_key() != *class);
            for slot in grid.iter().cloned() {
                tx.insert(slot)?;
            }
            Ok(replaced)
        })?;

        info!(
            "Generated timetable for {} ({} slot(s), replaced {})",
            class,
            grid.len(),
            replaced
        );
        Ok(grid)
    }

    /// A class's grid ordered by day then period
    pub fn timetable_for(&self, class: &ClassKey) -> Vec<&TimetableSlot> {
        self.tables
            .timetable
            .iter()
            .filter(|slot| slot.class_key() == *class)
            .collect()
    }

    /// Every slot taught by a staff member, ordered by day then period
    pub fn timetable_for_staff(&self, staff_no: &str) -> Vec<&TimetableSlot> {
        let mut slots: Vec<&TimetableSlot> = self
            .tables
            .timetable
            .iter()
            .filter(|slot| slot.staff_id == staff_no)
            .collect();
        slots.sort_by(|a, b| (a.day, a.period).cmp(&(b.day, b.period)));
        slots
    }

    /// Distinct classes a staff member teaches
    pub fn classes_for_staff(&self, staff_no: &str) -> Vec<ClassKey> {
        self.tables
            .timetable
            .iter()
            .filter(|slot| slot.staff_id == staff_no)
            .map(TimetableSlot::class_key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The grid of the class a student belongs to
    pub fn timetable_for_student(&self, roll_no: &str) -> CoreResult<Vec<&TimetableSlot>> {
        let student = self
            .get_student(roll_no)
            .ok_or_else(|| CoreError::not_found("Student", roll_no))?;
        Ok(self.timetable_for(&student.class_key()))
    }

    // ==================== Attendance Operations ====================

    /// Mark one student present or absent on a date
    pub fn set_attendance_status(
        &mut self,
        roll_no: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> CoreResult<()> {
        self.submit_attendance(date, &[(roll_no.to_string(), status)])
            .map(|_| ())
    }

    /// Record a whole sheet at once; nothing is written if any entry fails
    ///
    /// Returns the number of records created (as opposed to updated).
    pub fn submit_attendance(
        &mut self,
        date: NaiveDate,
        entries: &[(String, AttendanceStatus)],
    ) -> CoreResult<usize> {
        let today = self.clock.today();
        if let Err(e) = self.freeze.check(date, today) {
            warn!("Rejected attendance for frozen date {}", date);
            return Err(e);
        }

        let created = self.write(|tx| {
            let mut created = 0;
            for (roll_no, status) in entries {
                let semester = tx.require::<Student>(roll_no)?.semester;
                let key = AttendanceKey {
                    roll_no: roll_no.clone(),
                    date,
                };
                let status = *status;
                if tx.get::<AttendanceRecord>(&key).is_some() {
                    tx.update::<AttendanceRecord>(&key, |r| r.status = status)?;
                } else {
                    tx.insert(AttendanceRecord {
                        roll_no: roll_no.clone(),
                        date,
                        status,
                        semester,
                    })?;
                    created += 1;
                }
            }
            Ok(created)
        })?;

        info!(
            "Recorded attendance for {} student(s) on {}",
            entries.len(),
            date
        );
        Ok(created)
    }

    /// The roster of a class with each student's status on a date
    ///
    /// Students without a record show as present.
    pub fn attendance_sheet(&self, class: &ClassKey, date: NaiveDate) -> AttendanceSheet {
        let frozen = self.freeze.is_frozen(date, self.clock.today());
        let mut sheet = AttendanceSheet::new(class, date, frozen);

        for student in self.class_roster(class) {
            let key = AttendanceKey {
                roll_no: student.roll_no.clone(),
                date,
            };
            let record = self.tables.attendance.get(&key);
            sheet.rows.push(SheetRow {
                roll_no: student.roll_no.clone(),
                name: student.name.clone(),
                status: record.map_or(AttendanceStatus::Present, |r| r.status),
                recorded: record.is_some(),
            });
        }
        sheet
    }

    /// Present / total counts and percentage for one student
    pub fn attendance_summary(&self, roll_no: &str) -> CoreResult<AttendanceSummary> {
        if self.get_student(roll_no).is_none() {
            return Err(CoreError::not_found("Student", roll_no));
        }
        Ok(summarize(
            roll_no,
            self.tables.attendance.iter().cloned(),
        ))
    }

    // ==================== Mark Operations ====================

    /// Record a score; each (student, semester, subject) is recorded once
    pub fn record_mark(&mut self, mark: MarkRecord) -> CoreResult<()> {
        let mark = validate_mark(mark)?;
        let roll_no = mark.roll_no.clone();

        self.write(|tx| {
            tx.require::<Student>(&mark.roll_no)?;
            tx.insert(mark)
        })?;

        info!("Recorded mark for {}", roll_no);
        Ok(())
    }

    /// Correct the score of an existing mark
    pub fn update_mark(&mut self, mark: MarkRecord) -> CoreResult<()> {
        let mark = validate_mark(mark)?;
        let key = mark.key();
        self.write(|tx| tx.replace(mark))?;

        info!("Updated mark {}", key);
        Ok(())
    }

    pub fn delete_mark(&mut self, roll_no: &str, semester: u8, subject: &str) -> CoreResult<()> {
        let key = MarkKey {
            roll_no: roll_no.to_string(),
            semester,
            subject: subject.trim().to_string(),
        };
        self.write(|tx| tx.remove::<MarkRecord>(&key))?;

        info!("Deleted mark {}", key);
        Ok(())
    }

    /// A student's marks, optionally limited to one semester
    pub fn marks_for(&self, roll_no: &str, semester: Option<u8>) -> Vec<&MarkRecord> {
        self.tables
            .marks
            .iter()
            .filter(|m| m.roll_no == roll_no)
            .filter(|m| semester.map_or(true, |sem| m.semester == sem))
            .collect()
    }

    // ==================== Stats ====================

    pub fn overview(&self) -> Overview {
        Overview {
            students: self.tables.students.len(),
            staff: self.tables.staff.len(),
            departments: self.tables.departments.len(),
            subjects: self
                .tables
                .departments
                .iter()
                .map(|d| d.subjects.len())
                .sum(),
        }
    }

    /// Byte sizes of the stored collections
    pub fn storage_stats(&self) -> CoreResult<StorageStats> {
        Ok(self.persistence.stats()?)
    }

    /// Erase everything and start again from the seeded state
    pub fn reset(&mut self) -> CoreResult<()> {
        self.persistence.delete_all()?;
        self.tables = Tables::seeded();
        self.persistence.save(&self.tables)?;
        warn!("Reset data store");
        Ok(())
    }

    // ==================== Internals ====================

    /// Run `op` in a transaction and flush the result
    ///
    /// The transaction is dropped (and so rolled back) if `op` or the flush
    /// fails. A flush can fail after some keys were written, so the restored
    /// tables are written back over them.
    fn write<T>(
        &mut self,
        op: impl FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut tx = Transaction::begin(&mut self.tables);
        let value = op(&mut tx)?;

        if let Err(e) = self.persistence.save(tx.tables()) {
            warn!("Flush failed, rolling back: {}", e);
            drop(tx);
            if let Err(restore) = self.persistence.save(&self.tables) {
                warn!("Could not restore stored collections: {}", restore);
            }
            return Err(e.into());
        }

        tx.commit();
        Ok(value)
    }
}

/// Trimmed, non-empty text
fn required(field: &'static str, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn check_semester(semester: u8) -> CoreResult<u8> {
    if !(1..=MAX_SEMESTER).contains(&semester) {
        return Err(CoreError::invalid(
            "semester",
            format!("{} is outside 1-{}", semester, MAX_SEMESTER),
        ));
    }
    Ok(semester)
}

fn validate_mark(mark: MarkRecord) -> CoreResult<MarkRecord> {
    if mark.score > 100 {
        return Err(CoreError::invalid(
            "score",
            format!("{} is outside 0-100", mark.score),
        ));
    }
    check_semester(mark.semester)?;
    let subject = required("subject", &mark.subject)?;
    Ok(MarkRecord { subject, ..mark })
}

fn validate_student_form(form: StudentForm) -> CoreResult<StudentForm> {
    Ok(StudentForm {
        name: required("name", &form.name)?,
        degree: form.degree,
        dept: required("department", &form.dept)?,
        semester: check_semester(form.semester)?,
        section: required("section", &form.section)?,
    })
}

fn validate_staff_form(form: StaffForm) -> CoreResult<StaffForm> {
    Ok(StaffForm {
        name: required("name", &form.name)?,
        dept: required("department", &form.dept)?,
        specialization: form.specialization.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::FixedClock;
    use crate::models::Degree;
    use crate::storage::StorageError;
    use crate::timetable::{match_staff, Assignment};
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn test_store() -> Store {
        Store::in_memory()
            .unwrap()
            .with_clock(FixedClock(today()))
            .with_seed(11)
    }

    fn student_form(name: &str, sem: u8, sec: &str) -> StudentForm {
        StudentForm {
            name: name.to_string(),
            degree: Degree::BTech,
            dept: "CSE".to_string(),
            semester: sem,
            section: sec.to_string(),
        }
    }

    fn staff_form(name: &str, specialization: &str) -> StaffForm {
        StaffForm {
            name: name.to_string(),
            dept: "CSE".to_string(),
            specialization: specialization.to_string(),
        }
    }

    /// Always the first subject of the semester
    struct FirstSubject;

    impl SlotAssigner for FirstSubject {
        fn assign(&mut self, subjects: &[Subject], staff: &[Staff]) -> Assignment {
            match_staff(&subjects[0].name, staff)
        }
    }

    /// Backend whose writes can be switched off
    struct FlakyStore {
        inner: MemoryStore,
        fail: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> crate::storage::StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &[u8]) -> crate::storage::StorageResult<()> {
            if self.fail.get() {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> crate::storage::StorageResult<()> {
            self.inner.remove(key)
        }
        fn keys(&self) -> crate::storage::StorageResult<Vec<String>> {
            self.inner.keys()
        }
    }

    /// On-disk backend that refuses to write one key
    struct KeyFailingStore {
        inner: FileStore,
        key: &'static str,
    }

    impl KeyValueStore for KeyFailingStore {
        fn get(&self, key: &str) -> crate::storage::StorageResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: &[u8]) -> crate::storage::StorageResult<()> {
            if key == self.key {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> crate::storage::StorageResult<()> {
            self.inner.remove(key)
        }
        fn keys(&self) -> crate::storage::StorageResult<Vec<String>> {
            self.inner.keys()
        }
    }

    #[test]
    fn test_open_creates_seeded_store_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_config(test_config(&temp_dir)).unwrap();

        assert!(store.get_user("ADM001").is_some());
        assert_eq!(store.list_departments().len(), 2);
        assert!(temp_dir.path().join("edu_users.json").exists());
    }

    #[test]
    fn test_reopen_keeps_data_and_counters() {
        let temp_dir = TempDir::new().unwrap();
        let first = {
            let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
            let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();
            store.delete_student(&login.id).unwrap();
            login
        };

        let mut store = Store::open_with_config(test_config(&temp_dir)).unwrap();
        assert!(store.get_student(&first.id).is_none());
        let second = store.admit_student(student_form("Ravi", 3, "A")).unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.id, "STU0002");
    }

    #[test]
    fn test_authenticate_is_exact() {
        let store = test_store();
        assert_eq!(store.authenticate("ADM001", "admin123").unwrap().role, Role::Admin);
        assert!(matches!(
            store.authenticate("ADM001", "Admin123"),
            Err(CoreError::AuthFailure)
        ));
        assert!(matches!(
            store.authenticate("adm001", "admin123"),
            Err(CoreError::AuthFailure)
        ));
        assert!(matches!(
            store.authenticate("ADM001", "admin12"),
            Err(CoreError::AuthFailure)
        ));
    }

    #[test]
    fn test_admit_student_creates_record_and_login() {
        let mut store = test_store();
        let users_before = store.list_users().len();

        let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        assert_eq!(login.id, "STU0001");
        assert_eq!(login.password.len(), 8);

        let student = store.get_student("STU0001").unwrap();
        assert_eq!(student.email, "stu0001@eduflow.edu");
        assert_eq!(student.password, login.password);
        assert_eq!(store.list_users().len(), users_before + 1);
        assert!(store.authenticate("STU0001", &login.password).is_ok());
    }

    #[test]
    fn test_admit_student_validation() {
        let mut store = test_store();

        let err = store.admit_student(student_form("  ", 3, "A")).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "name", .. }));

        let err = store.admit_student(student_form("Asha", 9, "A")).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "semester", .. }));

        let mut form = student_form("Asha", 3, "A");
        form.dept = "MECH".to_string();
        let err = store.admit_student(form).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Department", .. }));

        // Failed admissions do not consume ids
        let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        assert_eq!(login.id, "STU0001");
    }

    #[test]
    fn test_update_student_keeps_id_and_password() {
        let mut store = test_store();
        let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();

        let mut form = student_form("Asha Rao", 4, "B");
        form.dept = "ECE".to_string();
        store.update_student(&login.id, form).unwrap();

        let student = store.get_student(&login.id).unwrap();
        assert_eq!(student.name, "Asha Rao");
        assert_eq!(student.class_key(), ClassKey::new("ECE", 4, "B"));
        assert_eq!(student.password, login.password);
        assert_eq!(store.get_user(&login.id).unwrap().name, "Asha Rao");

        let err = store
            .update_student("STU0099", student_form("X", 1, "A"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_delete_student_cascades_to_user() {
        let mut store = test_store();
        let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();

        store.delete_student(&login.id).unwrap();
        assert!(store.get_student(&login.id).is_none());
        assert!(store.get_user(&login.id).is_none());

        let err = store.delete_student(&login.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Student", .. }));
    }

    #[test]
    fn test_delete_without_login_removes_nothing() {
        let mut store = test_store();
        let login = store.hire_staff(staff_form("Jane", "Networks")).unwrap();
        store.tables.users.remove(&login.id).unwrap();

        let err = store.delete_staff(&login.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "User", .. }));
        assert!(store.get_staff(&login.id).is_some());
    }

    #[test]
    fn test_change_password_updates_both_records() {
        let mut store = test_store();
        let login = store.hire_staff(staff_form("Jane", "Networks")).unwrap();

        store.change_password(&login.id, "n3wpass").unwrap();
        assert!(store.authenticate(&login.id, "n3wpass").is_ok());
        assert_eq!(store.get_staff(&login.id).unwrap().password, "n3wpass");

        let err = store.change_password(&login.id, "abc").unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "password", .. }));

        let err = store.change_password("FAC0099", "longenough").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut store = test_store();
        store.admit_student(student_form("Asha", 3, "A")).unwrap();
        store.admit_student(student_form("Ravi", 3, "B")).unwrap();
        store.hire_staff(staff_form("Jane", "Data Structures")).unwrap();

        assert_eq!(store.search_students("asha").len(), 1);
        assert_eq!(store.search_students("stu").len(), 2);
        assert_eq!(store.search_students("cse").len(), 2);
        assert_eq!(store.search_staff("data struct").len(), 1);
        assert!(store.search_staff("biology").is_empty());
    }

    #[test]
    fn test_class_roster() {
        let mut store = test_store();
        store.admit_student(student_form("Asha", 3, "A")).unwrap();
        store.admit_student(student_form("Ravi", 3, "B")).unwrap();
        store.admit_student(student_form("Mina", 3, "A")).unwrap();

        let roster = store.class_roster(&ClassKey::new("CSE", 3, "A"));
        let names: Vec<&str> = roster.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Mina"]);
    }

    #[test]
    fn test_departments_and_subjects() {
        let mut store = test_store();
        store.create_department("MECH", "Mechanical").unwrap();
        assert!(matches!(
            store.create_department("MECH", "Again").unwrap_err(),
            CoreError::DuplicateKey { .. }
        ));

        store
            .add_subject("MECH", Subject::new("TD", "Thermodynamics", 3))
            .unwrap();
        store
            .add_subject("MECH", Subject::new("FM", "Fluid Mechanics", 4))
            .unwrap();

        let err = store
            .add_subject("MECH", Subject::new("TD", "Thermo II", 5))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { kind: "Subject", .. }));

        let err = store
            .add_subject("MECH", Subject::new("X", "Nothing", 0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        assert_eq!(store.subjects_for("MECH", 3).unwrap().len(), 1);
        assert!(store.subjects_for("MECH", 6).unwrap().is_empty());
        assert!(store.subjects_for("CIVIL", 1).is_err());
        assert_eq!(store.overview().subjects, 2);
    }

    #[test]
    fn test_rename_and_delete_department() {
        let mut store = test_store();
        store.rename_department("ECE", "Electronics & Comm").unwrap();
        assert_eq!(store.get_department("ECE").unwrap().name, "Electronics & Comm");
        assert!(store.rename_department("CIVIL", "Civil").is_err());

        store.hire_staff(staff_form("Jane", "Networks")).unwrap();
        let err = store.delete_department("CSE").unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "department", .. }));

        store
            .add_subject("ECE", Subject::new("SS", "Signals", 1))
            .unwrap();
        store
            .generate_timetable(&ClassKey::new("ECE", 1, "A"))
            .unwrap();
        store.delete_department("ECE").unwrap();
        assert!(store.get_department("ECE").is_none());
        assert!(store.timetable_for(&ClassKey::new("ECE", 1, "A")).is_empty());

        let err = store.delete_department("ECE").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Department", .. }));
    }

    #[test]
    fn test_generate_timetable_replaces_grid() {
        let mut store = test_store();
        store
            .add_subject("CSE", Subject::new("DS", "Data Structures", 1))
            .unwrap();
        let jane = store.hire_staff(staff_form("Jane", "Data Structures")).unwrap();
        let class = ClassKey::new("CSE", 1, "A");

        let grid = store.generate_timetable(&class).unwrap();
        assert_eq!(grid.len(), 30);
        assert!(grid.iter().all(|s| s.staff_id == jane.id));

        store.generate_timetable(&class).unwrap();
        assert_eq!(store.timetable_for(&class).len(), 30);
    }

    #[test]
    fn test_generate_timetable_keeps_other_classes() {
        let mut store = test_store();
        store
            .add_subject("CSE", Subject::new("DS", "Data Structures", 1))
            .unwrap();
        let a = ClassKey::new("CSE", 1, "A");
        let b = ClassKey::new("CSE", 1, "B");

        store.generate_timetable_with(&a, &mut FirstSubject).unwrap();
        store.generate_timetable_with(&b, &mut FirstSubject).unwrap();
        store.generate_timetable_with(&a, &mut FirstSubject).unwrap();

        assert_eq!(store.timetable_for(&a).len(), 30);
        assert_eq!(store.timetable_for(&b).len(), 30);
        // No staff in the department
        assert!(store.timetable_for(&a).iter().all(|s| s.staff == "TBD"));
    }

    #[test]
    fn test_generate_timetable_errors() {
        let mut store = test_store();
        let err = store
            .generate_timetable(&ClassKey::new("CSE", 2, "A"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSubjectsAvailable { semester: 2, .. }));

        let err = store
            .generate_timetable(&ClassKey::new("CIVIL", 1, "A"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Department", .. }));
    }

    #[test]
    fn test_staff_and_student_timetable_queries() {
        let mut store = test_store();
        store
            .add_subject("CSE", Subject::new("DS", "Data Structures", 3))
            .unwrap();
        let jane = store.hire_staff(staff_form("Jane", "Data Structures")).unwrap();
        let asha = store.admit_student(student_form("Asha", 3, "B")).unwrap();

        store
            .generate_timetable_with(&ClassKey::new("CSE", 3, "A"), &mut FirstSubject)
            .unwrap();
        store
            .generate_timetable_with(&ClassKey::new("CSE", 3, "B"), &mut FirstSubject)
            .unwrap();

        assert_eq!(store.timetable_for_staff(&jane.id).len(), 60);
        assert_eq!(
            store.classes_for_staff(&jane.id),
            vec![ClassKey::new("CSE", 3, "A"), ClassKey::new("CSE", 3, "B")]
        );

        let mine = store.timetable_for_student(&asha.id).unwrap();
        assert_eq!(mine.len(), 30);
        assert!(mine.iter().all(|s| s.sec == "B"));
        assert!(store.timetable_for_student("STU0099").is_err());
    }

    #[test]
    fn test_attendance_upsert_and_freeze() {
        let mut store = test_store();
        let asha = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        let week_ago = today() - chrono::Duration::days(7);
        let too_old = today() - chrono::Duration::days(8);

        store
            .set_attendance_status(&asha.id, week_ago, AttendanceStatus::Present)
            .unwrap();
        store
            .set_attendance_status(&asha.id, week_ago, AttendanceStatus::Absent)
            .unwrap();
        let summary = store.attendance_summary(&asha.id).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.records[0].status, AttendanceStatus::Absent);
        assert_eq!(summary.records[0].semester, 3);

        let err = store
            .set_attendance_status(&asha.id, too_old, AttendanceStatus::Present)
            .unwrap_err();
        assert!(matches!(err, CoreError::FrozenRecord { elapsed_days: 8, .. }));

        let err = store
            .set_attendance_status("STU0099", today(), AttendanceStatus::Present)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_submit_attendance_is_all_or_nothing() {
        let mut store = test_store();
        let asha = store.admit_student(student_form("Asha", 3, "A")).unwrap();

        let err = store
            .submit_attendance(
                today(),
                &[
                    (asha.id.clone(), AttendanceStatus::Absent),
                    ("STU0099".to_string(), AttendanceStatus::Present),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(store.attendance_summary(&asha.id).unwrap().total, 0);
    }

    #[test]
    fn test_attendance_sheet_defaults_and_frozen_flag() {
        let mut store = test_store();
        let asha = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        let ravi = store.admit_student(student_form("Ravi", 3, "A")).unwrap();
        store
            .set_attendance_status(&ravi.id, today(), AttendanceStatus::Absent)
            .unwrap();

        let class = ClassKey::new("CSE", 3, "A");
        let sheet = store.attendance_sheet(&class, today());
        assert!(!sheet.frozen);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].roll_no, asha.id);
        assert_eq!(sheet.rows[0].status, AttendanceStatus::Present);
        assert!(!sheet.rows[0].recorded);
        assert_eq!(sheet.rows[1].status, AttendanceStatus::Absent);

        let old = store.attendance_sheet(&class, today() - chrono::Duration::days(30));
        assert!(old.frozen);
    }

    #[test]
    fn test_marks() {
        let mut store = test_store();
        let asha = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        let mark = |subject: &str, score: u8, semester: u8| MarkRecord {
            roll_no: asha.id.clone(),
            subject: subject.to_string(),
            score,
            semester,
        };

        store.record_mark(mark("Data Structures", 88, 3)).unwrap();
        store.record_mark(mark("Networks", 71, 2)).unwrap();

        assert!(matches!(
            store.record_mark(mark("Data Structures", 90, 3)).unwrap_err(),
            CoreError::DuplicateKey { .. }
        ));
        assert!(matches!(
            store.record_mark(mark("Compilers", 101, 3)).unwrap_err(),
            CoreError::Validation { field: "score", .. }
        ));

        assert_eq!(store.marks_for(&asha.id, None).len(), 2);
        assert_eq!(store.marks_for(&asha.id, Some(3)).len(), 1);

        store.update_mark(mark("Data Structures", 92, 3)).unwrap();
        assert_eq!(store.marks_for(&asha.id, Some(3))[0].score, 92);
        assert!(matches!(
            store.update_mark(mark("Compilers", 60, 3)).unwrap_err(),
            CoreError::NotFound { kind: "Mark", .. }
        ));

        store.delete_mark(&asha.id, 2, "Networks").unwrap();
        assert_eq!(store.marks_for(&asha.id, None).len(), 1);
        assert!(store.delete_mark(&asha.id, 2, "Networks").is_err());

        let stranger = MarkRecord {
            roll_no: "STU0099".to_string(),
            ..mark("Networks", 50, 3)
        };
        assert!(store.record_mark(stranger).is_err());
    }

    #[test]
    fn test_failed_flush_rolls_back() {
        let fail = std::rc::Rc::new(std::cell::Cell::new(false));
        let backend = FlakyStore {
            inner: MemoryStore::new(),
            fail: fail.clone(),
        };
        let mut store = Store::with_backend(Box::new(backend), Config::default()).unwrap();

        fail.set(true);
        let err = store.admit_student(student_form("Asha", 3, "A")).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(!err.is_user_error());
        assert!(store.list_students().is_empty());
        assert_eq!(store.list_users().len(), 1);

        fail.set(false);
        let login = store.admit_student(student_form("Asha", 3, "A")).unwrap();
        assert_eq!(login.id, "STU0001");
    }

    #[test]
    fn test_partial_flush_leaves_no_orphan_login_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        drop(Store::open_with_config(test_config(&temp_dir)).unwrap());

        let backend = KeyFailingStore {
            inner: FileStore::open(temp_dir.path()).unwrap(),
            key: "edu_students",
        };
        let mut store = Store::with_backend(Box::new(backend), test_config(&temp_dir)).unwrap();
        assert!(store.admit_student(student_form("Asha", 3, "A")).is_err());
        assert_eq!(store.list_users().len(), 1);

        let reopened = Store::open_with_config(test_config(&temp_dir)).unwrap();
        assert!(reopened.get_user("STU0001").is_none());
        assert!(reopened.list_students().is_empty());
        assert_eq!(reopened.list_users().len(), 1);
    }

    #[test]
    fn test_overview_and_reset() {
        let mut store = test_store();
        store.admit_student(student_form("Asha", 3, "A")).unwrap();
        store.hire_staff(staff_form("Jane", "Networks")).unwrap();

        let overview = store.overview();
        assert_eq!(overview.students, 1);
        assert_eq!(overview.staff, 1);
        assert_eq!(overview.departments, 2);
        assert!(store.storage_stats().unwrap().total_size() > 0);

        store.reset().unwrap();
        assert_eq!(store.overview().students, 0);
        assert!(store.get_user("ADM001").is_some());
    }
}
