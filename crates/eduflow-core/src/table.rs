//! Typed tables
//!
//! Each collection is a `Table<R>`: an ordered map from the record's
//! primary key to the record. Tables persist as plain JSON arrays so the
//! stored layout stays a sequence of records.
//!
//! Every mutating operation returns a `Change` describing how to undo it.
//! `Transaction` collects those changes; see `transaction.rs`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::ids::{IdCounters, STAFF_PREFIX, STUDENT_PREFIX};
use crate::models::{
    AttendanceKey, AttendanceRecord, Department, MarkKey, MarkRecord, SlotKey, Staff, Student,
    TimetableSlot, User,
};

/// A record stored in one of the seven tables
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Primary key type
    type Key: Ord + Clone + fmt::Debug + fmt::Display;

    /// Human-readable record kind used in error messages
    const KIND: &'static str;

    fn key(&self) -> Self::Key;

    /// The table holding this record type
    fn table(tables: &Tables) -> &Table<Self>;

    /// Mutable access to the table holding this record type
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    /// Tag a change with its table so it can be replayed later
    fn undo(change: Change<Self>) -> Undo;
}

/// How to reverse one table mutation
#[derive(Debug, Clone)]
pub enum Change<R: Record> {
    /// A new record was inserted under this key
    Inserted(R::Key),
    /// A record was overwritten; holds the previous value
    Replaced(R),
    /// A record was removed; holds the removed value
    Removed(R),
}

/// Ordered primary-key map of records
#[derive(Debug, Clone)]
pub struct Table<R: Record> {
    rows: BTreeMap<R::Key, R>,
}

impl<R: Record> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Record> Table<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records, later duplicates replacing earlier ones
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let rows = records.into_iter().map(|r| (r.key(), r)).collect();
        Self { rows }
    }

    /// Insert a record whose key is not yet present
    pub fn insert(&mut self, record: R) -> CoreResult<Change<R>> {
        let key = record.key();
        if self.rows.contains_key(&key) {
            return Err(CoreError::duplicate(R::KIND, &key));
        }
        self.rows.insert(key.clone(), record);
        Ok(Change::Inserted(key))
    }

    /// Overwrite the record stored under the record's own key
    pub fn replace(&mut self, record: R) -> CoreResult<Change<R>> {
        let key = record.key();
        match self.rows.get_mut(&key) {
            Some(slot) => Ok(Change::Replaced(std::mem::replace(slot, record))),
            None => Err(CoreError::not_found(R::KIND, &key)),
        }
    }

    /// Remove the record stored under `key`
    pub fn remove(&mut self, key: &R::Key) -> CoreResult<Change<R>> {
        self.rows
            .remove(key)
            .map(Change::Removed)
            .ok_or_else(|| CoreError::not_found(R::KIND, key))
    }

    /// Remove every record the predicate rejects
    pub fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) -> Vec<Change<R>> {
        let doomed: Vec<R::Key> = self
            .rows
            .iter()
            .filter(|(_, r)| !keep(*r))
            .map(|(k, _)| k.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|k| self.rows.remove(&k).map(Change::Removed))
            .collect()
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &R::Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Records in key order
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Undo a change previously returned by this table
    pub(crate) fn revert(&mut self, change: Change<R>) {
        match change {
            Change::Inserted(key) => {
                self.rows.remove(&key);
            }
            Change::Replaced(previous) | Change::Removed(previous) => {
                self.rows.insert(previous.key(), previous);
            }
        }
    }
}

impl<R: Record> Serialize for Table<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.values())
    }
}

/// Stored collections must not repeat a primary key; loading fails rather
/// than keep one copy and lose the other on the next flush.
impl<'de, R: Record> Deserialize<'de> for Table<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<R>::deserialize(deserializer)?;
        let mut rows = BTreeMap::new();
        for record in records {
            let key = record.key();
            if rows.contains_key(&key) {
                warn!("Duplicate {} {} in stored collection", R::KIND, key);
                return Err(de::Error::custom(format!(
                    "duplicate {} key {}",
                    R::KIND.to_lowercase(),
                    key
                )));
            }
            rows.insert(key, record);
        }
        Ok(Self { rows })
    }
}

/// All persisted collections
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: Table<User>,
    pub students: Table<Student>,
    pub staff: Table<Staff>,
    pub departments: Table<Department>,
    pub attendance: Table<AttendanceRecord>,
    pub marks: Table<MarkRecord>,
    pub timetable: Table<TimetableSlot>,
    pub counters: IdCounters,
}

impl Tables {
    /// Fresh tables holding the seeded admin and departments
    pub fn seeded() -> Self {
        Self {
            users: Table::from_records([User::seeded_admin()]),
            departments: Table::from_records(Department::seeded()),
            ..Self::default()
        }
    }

    /// Bring counters past every id already in use
    ///
    /// Needed for data written before counters were persisted.
    pub fn reconcile_counters(&mut self) {
        for student in self.students.iter() {
            self.counters.observe(STUDENT_PREFIX, &student.roll_no);
        }
        for staff in self.staff.iter() {
            self.counters.observe(STAFF_PREFIX, &staff.staff_no);
        }
        for user in self.users.iter() {
            self.counters.observe(STUDENT_PREFIX, &user.id);
            self.counters.observe(STAFF_PREFIX, &user.id);
        }
    }
}

/// A change tagged with the table it belongs to
#[derive(Debug, Clone)]
pub enum Undo {
    Users(Change<User>),
    Students(Change<Student>),
    Staff(Change<Staff>),
    Departments(Change<Department>),
    Attendance(Change<AttendanceRecord>),
    Marks(Change<MarkRecord>),
    Timetable(Change<TimetableSlot>),
    /// Counters before an id was minted
    Counters(IdCounters),
}

impl Undo {
    pub(crate) fn revert(self, tables: &mut Tables) {
        match self {
            Undo::Users(c) => tables.users.revert(c),
            Undo::Students(c) => tables.students.revert(c),
            Undo::Staff(c) => tables.staff.revert(c),
            Undo::Departments(c) => tables.departments.revert(c),
            Undo::Attendance(c) => tables.attendance.revert(c),
            Undo::Marks(c) => tables.marks.revert(c),
            Undo::Timetable(c) => tables.timetable.revert(c),
            Undo::Counters(previous) => tables.counters = previous,
        }
    }
}

impl Record for User {
    type Key = String;
    const KIND: &'static str = "User";

    fn key(&self) -> String {
        self.id.clone()
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.users
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Users(change)
    }
}

impl Record for Student {
    type Key = String;
    const KIND: &'static str = "Student";

    fn key(&self) -> String {
        self.roll_no.clone()
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.students
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.students
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Students(change)
    }
}

impl Record for Staff {
    type Key = String;
    const KIND: &'static str = "Staff";

    fn key(&self) -> String {
        self.staff_no.clone()
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.staff
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.staff
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Staff(change)
    }
}

impl Record for Department {
    type Key = String;
    const KIND: &'static str = "Department";

    fn key(&self) -> String {
        self.id.clone()
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.departments
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.departments
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Departments(change)
    }
}

impl Record for AttendanceRecord {
    type Key = AttendanceKey;
    const KIND: &'static str = "Attendance record";

    fn key(&self) -> AttendanceKey {
        AttendanceKey {
            roll_no: self.roll_no.clone(),
            date: self.date,
        }
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.attendance
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.attendance
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Attendance(change)
    }
}

impl Record for MarkRecord {
    type Key = MarkKey;
    const KIND: &'static str = "Mark";

    fn key(&self) -> MarkKey {
        MarkKey {
            roll_no: self.roll_no.clone(),
            semester: self.semester,
            subject: self.subject.clone(),
        }
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.marks
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.marks
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Marks(change)
    }
}

impl Record for TimetableSlot {
    type Key = SlotKey;
    const KIND: &'static str = "Timetable slot";

    fn key(&self) -> SlotKey {
        SlotKey {
            class: self.class_key(),
            day: self.day,
            period: self.period,
        }
    }
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.timetable
    }
    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.timetable
    }
    fn undo(change: Change<Self>) -> Undo {
        Undo::Timetable(change)
    }
}
