use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use super::{PreferenceError, PreferenceStore};

/// In-memory preference storage for tests and simulation.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryPreferenceStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
