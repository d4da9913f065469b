//! Identifier and credential generation
//!
//! Ids are `PREFIX` followed by a zero-padded four digit sequence number.
//! `next_id` derives the number from a collection length; `IdCounters`
//! keeps a persisted high-water mark per prefix so deleting a record never
//! frees its id for reuse.

use std::collections::BTreeMap;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix for student roll numbers
pub const STUDENT_PREFIX: &str = "STU";

/// Prefix for staff numbers
pub const STAFF_PREFIX: &str = "FAC";

/// Length of generated passwords
pub const PASSWORD_LEN: usize = 8;

/// Build the id that follows `count` existing records
///
/// `next_id("STU", 0) == "STU0001"`, `next_id("STU", 9) == "STU0010"`.
pub fn next_id(prefix: &str, count: usize) -> String {
    format!("{}{:04}", prefix, count + 1)
}

/// Generate an 8 character lowercase alphanumeric password
///
/// Not suitable for anything security critical; the administrator sees it
/// immediately and hands it over.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Institutional email for an account id
pub fn institutional_email(id: &str, domain: &str) -> String {
    format!("{}@{}", id.to_lowercase(), domain)
}

/// Per-prefix monotonic sequence numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdCounters {
    issued: BTreeMap<String, usize>,
}

impl IdCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids issued so far for a prefix
    pub fn issued(&self, prefix: &str) -> usize {
        self.issued.get(prefix).copied().unwrap_or(0)
    }

    /// Issue the next id for a prefix
    pub fn mint(&mut self, prefix: &str) -> String {
        let count = self.issued.entry(prefix.to_string()).or_insert(0);
        let id = next_id(prefix, *count);
        *count += 1;
        id
    }

    /// Raise the counter so it is at least past an existing id
    ///
    /// Ids that don't carry the prefix or a numeric suffix are ignored.
    pub fn observe(&mut self, prefix: &str, id: &str) {
        let Some(suffix) = id.strip_prefix(prefix) else {
            return;
        };
        let Ok(n) = suffix.parse::<usize>() else {
            return;
        };
        let count = self.issued.entry(prefix.to_string()).or_insert(0);
        if n > *count {
            *count = n;
        }
    }
}
