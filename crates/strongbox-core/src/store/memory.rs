//! In-memory vault store.
//!
//! Used by tests and by callers that want a throwaway vault. Writes can be
//! made to fail on demand to exercise `StorageUnavailable` paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, VaultError};
use crate::store::traits::VaultStore;

#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    values: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `StorageUnavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock_values()?.keys().cloned().collect())
    }

    fn lock_values(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| VaultError::StorageUnavailable("memory store poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VaultError::StorageUnavailable(
                "memory store rejected write".to_string(),
            ));
        }
        Ok(())
    }
}

impl VaultStore for MemoryVaultStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock_values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.lock_values()?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.lock_values()?.remove(key);
        Ok(())
    }

    fn set_many(&self, items: &[(&str, &str)]) -> Result<()> {
        self.check_writable()?;
        let mut values = self.lock_values()?;
        for (key, value) in items {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        self.check_writable()?;
        let mut values = self.lock_values()?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}
