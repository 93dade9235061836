use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AuthError;

use super::SessionStorage;

/// In-process session storage. Lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` and `remove` calls that reached the storage.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values
            .lock()
            .map(|values| values.contains_key(key))
            .unwrap_or(false)
    }

    fn with_values<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<u8>>) -> T,
    ) -> Result<T, AuthError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| AuthError::Session("in-memory session lock poisoned".into()))?;
        Ok(f(&mut values))
    }
}

#[async_trait]
impl SessionStorage for MemorySession {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        self.with_values(|values| values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AuthError> {
        self.with_values(|values| {
            values.insert(key.to_string(), value);
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.with_values(|values| {
            values.remove(key);
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
