//! Vault store trait definition.
//!
//! `VaultStore` is the persistence collaborator shared by the key manager,
//! the entry store and the audit chain. It is a flat string key/value map;
//! all structure (JSON arrays, hex, base64) is owned by the callers.

use crate::error::Result;

/// Key/value persistence for vault state.
///
/// All implementations must ensure:
/// - `set` replaces the whole value atomically
/// - `set_many` / `remove_many` commit all items or none
/// - A missing key reads as `Ok(None)`, never as an error
pub trait VaultStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::StorageUnavailable` (or a backend error) if the
    /// backend cannot be read. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several values as one unit.
    fn set_many(&self, items: &[(&str, &str)]) -> Result<()> {
        for (key, value) in items {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several values as one unit.
    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Whether a value exists for `key`.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
