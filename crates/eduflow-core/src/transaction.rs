//! In-memory transactions
//!
//! A `Transaction` borrows the tables mutably and logs an `Undo` entry for
//! every change it makes. `commit` forgets the log. Dropping an uncommitted
//! transaction replays the log in reverse, so a multi-step operation (for
//! example removing a student together with its login) either lands
//! completely or leaves the tables exactly as they were.

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::table::{Record, Tables, Undo};

/// State of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Changes are being applied and logged
    Active,
    /// Changes are kept
    Committed,
    /// Changes were reverted
    RolledBack,
}

/// An undo-logged batch of table mutations
pub struct Transaction<'a> {
    tables: &'a mut Tables,
    log: Vec<Undo>,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    /// Start a transaction over the given tables
    pub fn begin(tables: &'a mut Tables) -> Self {
        Self {
            tables,
            log: Vec::new(),
            state: TransactionState::Active,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Number of logged changes
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Read access to the tables, including uncommitted changes
    pub fn tables(&self) -> &Tables {
        &*self.tables
    }

    pub fn get<R: Record>(&self, key: &R::Key) -> Option<&R> {
        R::table(&*self.tables).get(key)
    }

    /// Fetch a record or fail with `NotFound`
    pub fn require<R: Record>(&self, key: &R::Key) -> CoreResult<&R> {
        self.get::<R>(key)
            .ok_or_else(|| CoreError::not_found(R::KIND, key))
    }

    pub fn insert<R: Record>(&mut self, record: R) -> CoreResult<()> {
        let change = R::table_mut(self.tables).insert(record)?;
        self.log.push(R::undo(change));
        Ok(())
    }

    pub fn replace<R: Record>(&mut self, record: R) -> CoreResult<()> {
        let change = R::table_mut(self.tables).replace(record)?;
        self.log.push(R::undo(change));
        Ok(())
    }

    pub fn remove<R: Record>(&mut self, key: &R::Key) -> CoreResult<()> {
        let change = R::table_mut(self.tables).remove(key)?;
        self.log.push(R::undo(change));
        Ok(())
    }

    /// Edit a stored record in place
    pub fn update<R: Record>(&mut self, key: &R::Key, edit: impl FnOnce(&mut R)) -> CoreResult<()> {
        let mut record = self.require::<R>(key)?.clone();
        edit(&mut record);
        if record.key() != *key {
            return Err(CoreError::invalid("key", "primary key cannot change on update"));
        }
        self.replace(record)
    }

    /// Remove every record the predicate rejects, returning how many went
    pub fn retain<R: Record>(&mut self, keep: impl FnMut(&R) -> bool) -> usize {
        let changes = R::table_mut(self.tables).retain(keep);
        let removed = changes.len();
        self.log.extend(changes.into_iter().map(R::undo));
        removed
    }

    /// Issue the next id for a prefix
    pub fn mint_id(&mut self, prefix: &str) -> String {
        self.log.push(Undo::Counters(self.tables.counters.clone()));
        self.tables.counters.mint(prefix)
    }

    /// Keep every change made so far
    pub fn commit(mut self) {
        debug!("Committed {} change(s)", self.log.len());
        self.log.clear();
        self.state = TransactionState::Committed;
    }

    /// Revert every change made so far
    pub fn rollback(mut self) {
        self.revert_all();
    }

    fn revert_all(&mut self) {
        if !self.log.is_empty() {
            debug!("Rolling back {} change(s)", self.log.len());
        }
        while let Some(undo) = self.log.pop() {
            undo.revert(self.tables);
        }
        self.state = TransactionState::RolledBack;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active {
            self.revert_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::STUDENT_PREFIX;
    use crate::models::{Role, User};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            role: Role::Student,
            password: "pass".to_string(),
            email: String::new(),
        }
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut tables = Tables::seeded();
        let mut tx = Transaction::begin(&mut tables);
        tx.insert(user("STU0001")).unwrap();
        tx.remove::<User>(&"ADM001".to_string()).unwrap();
        assert_eq!(tx.len(), 2);
        tx.commit();

        assert!(tables.users.contains(&"STU0001".to_string()));
        assert!(!tables.users.contains(&"ADM001".to_string()));
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let mut tables = Tables::seeded();
        {
            let mut tx = Transaction::begin(&mut tables);
            tx.insert(user("STU0001")).unwrap();
            tx.update::<User>(&"ADM001".to_string(), |u| u.name = "Changed".to_string())
                .unwrap();
            let id = tx.mint_id(STUDENT_PREFIX);
            assert_eq!(id, "STU0001");
        }

        assert!(!tables.users.contains(&"STU0001".to_string()));
        assert_eq!(
            tables.users.get(&"ADM001".to_string()).unwrap().name,
            "Super Admin"
        );
        assert_eq!(tables.counters.issued(STUDENT_PREFIX), 0);
    }

    #[test]
    fn test_failed_step_undoes_earlier_steps() {
        let mut tables = Tables::seeded();
        tables.users.insert(user("STU0001")).unwrap();

        let result: CoreResult<()> = (|| {
            let mut tx = Transaction::begin(&mut tables);
            tx.remove::<User>(&"STU0001".to_string())?;
            tx.remove::<User>(&"STU9999".to_string())?;
            tx.commit();
            Ok(())
        })();

        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert!(tables.users.contains(&"STU0001".to_string()));
    }

    #[test]
    fn test_update_cannot_change_key() {
        let mut tables = Tables::seeded();
        let mut tx = Transaction::begin(&mut tables);
        let err = tx
            .update::<User>(&"ADM001".to_string(), |u| u.id = "ADM002".to_string())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn test_retain_is_reverted_on_rollback() {
        let mut tables = Tables::seeded();
        let mut tx = Transaction::begin(&mut tables);
        let removed = tx.retain::<User>(|_| false);
        assert_eq!(removed, 1);
        tx.rollback();

        assert_eq!(tables.users.len(), 1);
    }
}
