//! Collection persistence
//!
//! Maps `Tables` onto a `KeyValueStore`. Each collection lives under its own
//! stable key as a JSON array; the id counters live beside them. There is no
//! schema versioning: a missing key loads as its default (seeded admin,
//! seeded departments, or empty), anything else must parse as-is.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::backend::KeyValueStore;
use super::error::{StorageError, StorageResult};
use crate::table::Tables;

/// Keys used in the key-value store
pub mod keys {
    pub const USERS: &str = "edu_users";
    pub const STUDENTS: &str = "edu_students";
    pub const STAFF: &str = "edu_staff";
    pub const DEPARTMENTS: &str = "edu_departments";
    pub const ATTENDANCE: &str = "edu_attendance";
    pub const MARKS: &str = "edu_marks";
    pub const TIMETABLE: &str = "edu_timetable";
    pub const COUNTERS: &str = "edu_counters";

    /// Every key written by `Persistence::save`
    pub const ALL: [&str; 8] = [
        USERS,
        STUDENTS,
        STAFF,
        DEPARTMENTS,
        ATTENDANCE,
        MARKS,
        TIMETABLE,
        COUNTERS,
    ];
}

/// Sizes of the stored collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// (key, size in bytes) for every key present
    pub collections: Vec<(String, u64)>,
}

impl StorageStats {
    pub fn total_size(&self) -> u64 {
        self.collections.iter().map(|(_, size)| size).sum()
    }

    /// Get human-readable total size
    pub fn total_size_human(&self) -> String {
        format_bytes(self.total_size())
    }
}

/// Persistence layer over a key-value backend
pub struct Persistence {
    backend: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Whether any collection has been written yet
    pub fn exists(&self) -> StorageResult<bool> {
        for key in keys::ALL {
            if self.backend.contains(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Load every collection, falling back to defaults for missing keys
    pub fn load(&self) -> StorageResult<Tables> {
        let seeded = Tables::seeded();
        let mut tables = Tables {
            users: self.read_or(keys::USERS, seeded.users)?,
            students: self.read_or(keys::STUDENTS, seeded.students)?,
            staff: self.read_or(keys::STAFF, seeded.staff)?,
            departments: self.read_or(keys::DEPARTMENTS, seeded.departments)?,
            attendance: self.read_or(keys::ATTENDANCE, seeded.attendance)?,
            marks: self.read_or(keys::MARKS, seeded.marks)?,
            timetable: self.read_or(keys::TIMETABLE, seeded.timetable)?,
            counters: self.read_or(keys::COUNTERS, seeded.counters)?,
        };
        tables.reconcile_counters();

        debug!(
            "Loaded {} user(s), {} student(s), {} staff, {} timetable slot(s)",
            tables.users.len(),
            tables.students.len(),
            tables.staff.len(),
            tables.timetable.len()
        );
        Ok(tables)
    }

    /// Write the full snapshot of every collection
    pub fn save(&mut self, tables: &Tables) -> StorageResult<()> {
        self.write(keys::USERS, &tables.users)?;
        self.write(keys::STUDENTS, &tables.students)?;
        self.write(keys::STAFF, &tables.staff)?;
        self.write(keys::DEPARTMENTS, &tables.departments)?;
        self.write(keys::ATTENDANCE, &tables.attendance)?;
        self.write(keys::MARKS, &tables.marks)?;
        self.write(keys::TIMETABLE, &tables.timetable)?;
        self.write(keys::COUNTERS, &tables.counters)?;
        Ok(())
    }

    /// Remove every stored collection
    pub fn delete_all(&mut self) -> StorageResult<()> {
        for key in keys::ALL {
            self.backend.remove(key)?;
        }
        Ok(())
    }

    /// Byte sizes of every stored key
    pub fn stats(&self) -> StorageResult<StorageStats> {
        let mut stats = StorageStats::default();
        for key in self.backend.keys()? {
            if let Some(bytes) = self.backend.get(&key)? {
                stats.collections.push((key, bytes.len() as u64));
            }
        }
        Ok(stats)
    }

    fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> StorageResult<T> {
        match self.backend.get(key)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::CorruptCollection {
                    key: key.to_string(),
                    source,
                })
            }
            None => Ok(default),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &bytes)
    }
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_load_empty_store_gives_seeds() {
        let persistence = Persistence::new(Box::new(MemoryStore::new()));
        assert!(!persistence.exists().unwrap());

        let tables = persistence.load().unwrap();
        assert!(tables.users.contains(&"ADM001".to_string()));
        assert!(tables.departments.contains(&"CSE".to_string()));
        assert!(tables.departments.contains(&"ECE".to_string()));
    }

    #[test]
    fn test_save_and_load_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let mut persistence = Persistence::new(Box::new(store));

        let mut tables = Tables::seeded();
        tables
            .users
            .insert(User {
                id: "FAC0001".to_string(),
                name: "Jane".to_string(),
                role: Role::Staff,
                password: "pw".to_string(),
                email: "fac0001@eduflow.edu".to_string(),
            })
            .unwrap();
        tables.counters.mint("FAC");
        persistence.save(&tables).unwrap();
        assert!(persistence.exists().unwrap());

        for key in keys::ALL {
            assert!(temp_dir.path().join(format!("{}.json", key)).exists());
        }

        let reopened = Persistence::new(Box::new(FileStore::open(temp_dir.path()).unwrap()));
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.users.len(), 2);
        assert_eq!(loaded.counters.issued("FAC"), 1);
    }

    #[test]
    fn test_loads_legacy_browser_payload() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                keys::STUDENTS,
                br#"[{"rollNo":"STU0003","name":"Ravi","degree":"B.Sc","dept":"ECE","semester":"2","section":"B","email":"stu0003@eduflow.edu","password":"abcd1234","role":"student"}]"#,
            )
            .unwrap();
        backend
            .set(
                keys::TIMETABLE,
                br#"[{"dept":"ECE","sem":"2","sec":"B","day":"Monday","period":1,"subject":"Circuits","staff":"TBD","staffId":"NA"}]"#,
            )
            .unwrap();

        let persistence = Persistence::new(Box::new(backend));
        let mut tables = persistence.load().unwrap();

        assert_eq!(tables.students.len(), 1);
        assert_eq!(tables.timetable.len(), 1);
        // Counters pick up where the legacy ids left off
        assert_eq!(tables.counters.mint("STU"), "STU0004");
    }

    #[test]
    fn test_corrupt_collection_is_reported() {
        let mut backend = MemoryStore::new();
        backend.set(keys::MARKS, b"{ definitely not an array").unwrap();

        let persistence = Persistence::new(Box::new(backend));
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::CorruptCollection { ref key, .. } if key == "edu_marks"));
    }

    #[test]
    fn test_duplicate_roll_numbers_fail_to_load() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                keys::STUDENTS,
                br#"[{"rollNo":"STU0002","name":"Asha","degree":"B.Tech","dept":"CSE","semester":3,"section":"A","email":"stu0002@eduflow.edu","password":"aaaa1111","role":"student"},
                     {"rollNo":"STU0002","name":"Ravi","degree":"B.Tech","dept":"CSE","semester":3,"section":"A","email":"stu0002@eduflow.edu","password":"bbbb2222","role":"student"}]"#,
            )
            .unwrap();

        let persistence = Persistence::new(Box::new(backend));
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::CorruptCollection { ref key, .. } if key == "edu_students"));
        assert!(err.to_string().contains("STU0002"));
    }

    #[test]
    fn test_delete_all_and_stats() {
        let mut persistence = Persistence::new(Box::new(MemoryStore::new()));
        persistence.save(&Tables::seeded()).unwrap();

        let stats = persistence.stats().unwrap();
        assert_eq!(stats.collections.len(), keys::ALL.len());
        assert!(stats.total_size() > 0);

        persistence.delete_all().unwrap();
        assert!(!persistence.exists().unwrap());
        assert_eq!(persistence.stats().unwrap().total_size(), 0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
