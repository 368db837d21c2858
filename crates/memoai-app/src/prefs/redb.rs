//! Redb-backed durable preference storage.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{PreferenceError, PreferenceStore};

/// Table: preferences
/// Key: preference key
/// Value: preference value as a string
const PREFERENCES: TableDefinition<&str, &str> = TableDefinition::new("preferences");

/// Durable preference storage backed by Redb.
///
/// Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbPreferenceStore {
    db: Arc<Database>,
}

impl RedbPreferenceStore {
    /// Open or create a preference database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let db = Database::create(path.as_ref()).map_err(|e| PreferenceError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| PreferenceError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(PREFERENCES).map_err(|e| PreferenceError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| PreferenceError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl PreferenceStore for RedbPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let txn = self.db.begin_read().map_err(|e| PreferenceError::Io(e.to_string()))?;
        let table = txn.open_table(PREFERENCES).map_err(|e| PreferenceError::Io(e.to_string()))?;

        let value = table.get(key).map_err(|e| PreferenceError::Io(e.to_string()))?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let txn = self.db.begin_write().map_err(|e| PreferenceError::Io(e.to_string()))?;
        {
            let mut table =
                txn.open_table(PREFERENCES).map_err(|e| PreferenceError::Io(e.to_string()))?;
            table.insert(key, value).map_err(|e| PreferenceError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| PreferenceError::Io(e.to_string()))?;

        Ok(())
    }
}
