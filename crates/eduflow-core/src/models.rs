//! Data models for EduFlow
//!
//! Records keep the field names used by the dashboard's stored JSON
//! (`rollNo`, `staffNo`, `staffId`, ...) so existing data loads unchanged.
//! Numeric fields also accept the string form the old forms wrote.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Student => "student",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "student" => Ok(Role::Student),
            _ => Err(format!("{:?} is not a valid role", s)),
        }
    }
}

/// A login account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub password: String,
    pub email: String,
}

impl User {
    /// The administrator present in every fresh store
    pub fn seeded_admin() -> Self {
        Self {
            id: "ADM001".to_string(),
            name: "Super Admin".to_string(),
            role: Role::Admin,
            password: "admin123".to_string(),
            email: "admin@eduflow.edu".to_string(),
        }
    }
}

/// Degree programme a student is enrolled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degree {
    #[serde(rename = "B.Tech")]
    BTech,
    #[serde(rename = "M.Tech")]
    MTech,
    #[serde(rename = "B.Sc")]
    BSc,
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Degree::BTech => "B.Tech",
            Degree::MTech => "M.Tech",
            Degree::BSc => "B.Sc",
        };
        write!(f, "{}", token)
    }
}

impl FromStr for Degree {
    type Err = String;

    /// Accepts `B.Tech`, `btech`, `b.tech` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "btech" => Ok(Degree::BTech),
            "mtech" => Ok(Degree::MTech),
            "bsc" => Ok(Degree::BSc),
            _ => Err(format!("{:?} is not a valid degree (B.Tech, M.Tech, B.Sc)", s)),
        }
    }
}

/// An enrolled student
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub roll_no: String,
    pub name: String,
    pub degree: Degree,
    /// Department id
    pub dept: String,
    #[serde(deserialize_with = "u8_or_string")]
    pub semester: u8,
    pub section: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Student {
    /// The class this student belongs to
    pub fn class_key(&self) -> ClassKey {
        ClassKey::new(&self.dept, self.semester, &self.section)
    }
}

/// A member of teaching staff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub staff_no: String,
    pub name: String,
    pub dept: String,
    /// Free text matched against subject names when building timetables
    pub specialization: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Staff {
    /// Whether this staff member's specialization covers the subject name
    pub fn teaches(&self, subject_name: &str) -> bool {
        self.specialization
            .to_lowercase()
            .contains(&subject_name.to_lowercase())
    }
}

/// A subject taught in one semester of a department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub code: String,
    pub name: String,
    #[serde(deserialize_with = "u8_or_string")]
    pub semester: u8,
}

impl Subject {
    pub fn new(code: impl Into<String>, name: impl Into<String>, semester: u8) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            semester,
        }
    }
}

/// A department and its subject catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Department {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subjects: Vec::new(),
        }
    }

    /// Departments present in every fresh store
    pub fn seeded() -> Vec<Department> {
        vec![
            Department::new("CSE", "Computer Science"),
            Department::new("ECE", "Electronics"),
        ]
    }

    /// Subjects offered in the given semester, in catalog order
    pub fn subjects_for(&self, semester: u8) -> Vec<Subject> {
        self.subjects
            .iter()
            .filter(|s| s.semester == semester)
            .cloned()
            .collect()
    }
}

/// Attendance mark for one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(AttendanceStatus::Present),
            "absent" | "a" => Ok(AttendanceStatus::Absent),
            _ => Err(format!("{:?} is not a valid status (Present, Absent)", s)),
        }
    }
}

/// One student's attendance on one date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub roll_no: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(deserialize_with = "u8_or_string")]
    pub semester: u8,
}

/// Primary key of an attendance record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttendanceKey {
    pub roll_no: String,
    pub date: NaiveDate,
}

impl fmt::Display for AttendanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.roll_no, self.date)
    }
}

/// A score for one subject
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkRecord {
    pub roll_no: String,
    pub subject: String,
    #[serde(deserialize_with = "u8_or_string")]
    pub score: u8,
    #[serde(deserialize_with = "u8_or_string")]
    pub semester: u8,
}

/// Primary key of a mark record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkKey {
    pub roll_no: String,
    pub semester: u8,
    pub subject: String,
}

impl fmt::Display for MarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} semester {} {}",
            self.roll_no, self.semester, self.subject
        )
    }
}

/// Teaching day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    /// Teaching days in week order
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn short(&self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A (department, semester, section) triple identifying one class
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassKey {
    pub dept: String,
    pub sem: u8,
    pub sec: String,
}

impl ClassKey {
    pub fn new(dept: impl Into<String>, sem: u8, sec: impl Into<String>) -> Self {
        Self {
            dept: dept.into(),
            sem,
            sec: sec.into(),
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.dept, self.sem, self.sec)
    }
}

impl FromStr for ClassKey {
    type Err = String;

    /// Parses `DEPT-SEM-SEC`, e.g. `CSE-3-A`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split from the right so department ids may contain '-'
        let mut parts = s.rsplitn(3, '-');
        let (Some(sec), Some(sem), Some(dept)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("{:?} is not a class (expected DEPT-SEM-SEC)", s));
        };
        let sem = sem
            .parse::<u8>()
            .map_err(|_| format!("{:?} has a non-numeric semester", s))?;
        if dept.is_empty() || sec.is_empty() {
            return Err(format!("{:?} is not a class (expected DEPT-SEM-SEC)", s));
        }
        Ok(ClassKey::new(dept, sem, sec))
    }
}

/// One period of a generated timetable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    pub dept: String,
    #[serde(deserialize_with = "u8_or_string")]
    pub sem: u8,
    pub sec: String,
    pub day: Day,
    pub period: u8,
    pub subject: String,
    /// Staff name at generation time
    pub staff: String,
    pub staff_id: String,
}

impl TimetableSlot {
    pub fn class_key(&self) -> ClassKey {
        ClassKey::new(&self.dept, self.sem, &self.sec)
    }
}

/// Primary key of a timetable slot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub class: ClassKey,
    pub day: Day,
    pub period: u8,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} P{}", self.class, self.day.short(), self.period)
    }
}

/// Fields an administrator supplies when admitting or editing a student
#[derive(Debug, Clone, PartialEq)]
pub struct StudentForm {
    pub name: String,
    pub degree: Degree,
    pub dept: String,
    pub semester: u8,
    pub section: String,
}

/// Fields an administrator supplies when hiring or editing staff
#[derive(Debug, Clone, PartialEq)]
pub struct StaffForm {
    pub name: String,
    pub dept: String,
    pub specialization: String,
}

/// Login issued when an account is created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub id: String,
    pub password: String,
}

/// Accept `3` or `"3"`; the browser forms stored numbers as strings.
fn u8_or_string<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u8),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
