//! Panic wipe: overwrite entries, destroy key material, record the outcome.
//!
//! The audit log is not part of the wiped set unless `wipe_audit_log` is
//! set, so the final `panic_wipe_*` event survives as evidence. Physical
//! erasure is up to the backend (SQLite runs with `secure_delete`).

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{events, AuditChain, NewEvent};
use crate::crypto::primitives::{b64_encode, random_bytes, random_range};
use crate::entries::{Entry, EntryStore};
use crate::error::{Result, VaultError};
use crate::keys::KeyManager;
use crate::store::{keys, VaultStore};

pub const DEFAULT_PASSES: u32 = 3;
pub const DEFAULT_PASS_DELAY: Duration = Duration::from_millis(50);

const SCRAMBLE_MIN: usize = 32;
const SCRAMBLE_MAX: usize = 160;

/// How a panic wipe runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeOptions {
    /// Overwrite passes. Values below [`DEFAULT_PASSES`] are raised to it.
    pub passes: u32,
    pub pass_delay: Duration,
    /// Also remove the audit log and vault metadata. No event is recorded.
    pub wipe_audit_log: bool,
}

impl Default for WipeOptions {
    fn default() -> Self {
        Self {
            passes: DEFAULT_PASSES,
            pass_delay: DEFAULT_PASS_DELAY,
            wipe_audit_log: false,
        }
    }
}

impl WipeOptions {
    /// The number of overwrite passes a wipe actually runs.
    pub fn effective_passes(&self) -> u32 {
        self.passes.max(DEFAULT_PASSES)
    }
}

/// What a completed wipe did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WipeReport {
    pub entries_overwritten: usize,
    pub passes: u32,
    pub removed_keys: Vec<String>,
    pub audit_log_wiped: bool,
}

/// Runs the wipe over the vault's components.
pub struct PanicWipe<'a> {
    store: &'a dyn VaultStore,
    entries: &'a EntryStore,
    chain: &'a AuditChain,
    options: &'a WipeOptions,
}

impl<'a> PanicWipe<'a> {
    pub fn new(
        store: &'a dyn VaultStore,
        entries: &'a EntryStore,
        chain: &'a AuditChain,
        options: &'a WipeOptions,
    ) -> Self {
        Self {
            store,
            entries,
            chain,
            options,
        }
    }

    /// Wipe, then lock `key_manager`.
    ///
    /// Individual overwrite or delete failures do not stop the wipe; the
    /// final residue check decides the outcome.
    ///
    /// # Errors
    ///
    /// `PanicWipeIncomplete` listing the storage keys still present.
    pub fn perform(&self, key_manager: &mut KeyManager) -> Result<WipeReport> {
        let entries_overwritten = self.scramble_entries();

        if let Err(e) = self.entries.clear() {
            warn!(error = %e, "panic wipe: entry removal failed");
        }
        if let Err(e) = self.store.remove_many(&keys::KEY_MATERIAL) {
            warn!(error = %e, "panic wipe: key removal failed");
        }
        key_manager.lock();

        if self.options.wipe_audit_log {
            if let Err(e) = self.chain.clear() {
                warn!(error = %e, "panic wipe: audit log removal failed");
            }
            if let Err(e) = self.store.remove(keys::META) {
                warn!(error = %e, "panic wipe: metadata removal failed");
            }
        }

        let residue = self.residue()?;
        if !residue.is_empty() {
            warn!(residue = ?residue, "panic wipe left residue");
            if !self.options.wipe_audit_log {
                let detail = format!("residue: {}", residue.join(","));
                if let Err(e) = self
                    .chain
                    .append_event(NewEvent::new(events::PANIC_WIPE_FAILED, detail))
                {
                    warn!(error = %e, "panic wipe: could not record failure");
                }
            }
            return Err(VaultError::PanicWipeIncomplete { residue });
        }

        if !self.options.wipe_audit_log {
            self.chain.append_event(NewEvent::new(
                events::PANIC_WIPE_COMPLETED,
                format!(
                    "entries={} passes={}",
                    entries_overwritten,
                    self.options.effective_passes()
                ),
            ))?;
        }
        info!(entries_overwritten, "panic wipe completed");

        Ok(WipeReport {
            entries_overwritten,
            passes: self.options.effective_passes(),
            removed_keys: self.wiped_keys().iter().map(|k| k.to_string()).collect(),
            audit_log_wiped: self.options.wipe_audit_log,
        })
    }

    /// Overwrite every stored entry with random material, `passes` times.
    fn scramble_entries(&self) -> usize {
        let mut current = match self.entries.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "panic wipe: entries unreadable, skipping overwrite");
                return 0;
            }
        };

        for pass in 0..self.options.effective_passes() {
            if pass > 0 && !self.options.pass_delay.is_zero() {
                std::thread::sleep(self.options.pass_delay);
            }
            let scrambled = match current.iter().map(scramble).collect::<Result<Vec<_>>>() {
                Ok(scrambled) => scrambled,
                Err(e) => {
                    warn!(error = %e, pass, "panic wipe: scramble failed");
                    break;
                }
            };
            if let Err(e) = self.entries.overwrite_all(&scrambled) {
                warn!(error = %e, pass, "panic wipe: overwrite failed");
                break;
            }
            current = scrambled;
        }
        current.len()
    }

    fn wiped_keys(&self) -> Vec<&'static str> {
        let mut wiped = vec![keys::ENTRIES];
        wiped.extend(keys::KEY_MATERIAL);
        if self.options.wipe_audit_log {
            wiped.extend([keys::TAMPER_LOG, keys::META]);
        }
        wiped
    }

    fn residue(&self) -> Result<Vec<String>> {
        let mut residue = Vec::new();
        for key in self.wiped_keys() {
            if self.store.contains(key)? {
                residue.push(key.to_string());
            }
        }
        Ok(residue)
    }
}

fn noise() -> Result<Vec<u8>> {
    random_bytes(random_range(SCRAMBLE_MIN, SCRAMBLE_MAX)?)
}

fn scramble(entry: &Entry) -> Result<Entry> {
    Ok(Entry {
        id: entry.id.clone(),
        iv: hex::encode(noise()?),
        ciphertext: b64_encode(&noise()?),
        hmac: hex::encode(noise()?),
        timestamp: entry.timestamp.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;
    use crate::store::MemoryVaultStore;
    use std::sync::Arc;

    /// Store whose deletes of one key silently do nothing.
    struct StickyStore {
        inner: MemoryVaultStore,
        sticky: &'static str,
    }

    impl VaultStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            if key == self.sticky {
                return Ok(());
            }
            self.inner.remove(key)
        }

        fn remove_many(&self, keys: &[&str]) -> Result<()> {
            for key in keys {
                self.remove(key)?;
            }
            Ok(())
        }
    }

    fn fast() -> WipeOptions {
        WipeOptions {
            pass_delay: Duration::ZERO,
            ..WipeOptions::default()
        }
    }

    fn seeded(store: Arc<dyn VaultStore>) -> (KeyManager, EntryStore, AuditChain) {
        let mut manager = KeyManager::new(store.clone()).with_test_iterations(1000);
        manager.create_vault("correct-horse-battery").unwrap();
        let entries = EntryStore::new(store.clone());
        let key = MasterKey::generate().unwrap();
        entries.add(&key, "first").unwrap();
        entries.add(&key, "second").unwrap();
        let chain = AuditChain::new(store);
        chain
            .append_event(NewEvent::new(events::VAULT_CREATED, ""))
            .unwrap();
        (manager, entries, chain)
    }

    #[test]
    fn test_scramble_shapes() {
        let key = MasterKey::generate().unwrap();
        let entry = crate::entries::encrypt_entry(&key, "secret").unwrap();
        let scrambled = scramble(&entry).unwrap();

        assert_eq!(scrambled.id, entry.id);
        assert_ne!(scrambled.ciphertext, entry.ciphertext);
        let iv_len = scrambled.iv.len() / 2;
        assert!((SCRAMBLE_MIN..=SCRAMBLE_MAX).contains(&iv_len));
        assert!(crate::crypto::primitives::b64_decode(&scrambled.ciphertext).is_some());
    }

    #[test]
    fn test_wipe_removes_everything_but_the_log() {
        let store = Arc::new(MemoryVaultStore::new());
        let (mut manager, entries, chain) = seeded(store.clone());
        let options = fast();

        let report = PanicWipe::new(&*store, &entries, &chain, &options)
            .perform(&mut manager)
            .unwrap();

        assert_eq!(report.entries_overwritten, 2);
        assert_eq!(report.passes, 3);
        assert!(!manager.is_unlocked());
        assert_eq!(store.keys().unwrap(), vec![keys::TAMPER_LOG.to_string()]);

        let blocks = chain.blocks().unwrap();
        assert_eq!(blocks.last().unwrap().event, events::PANIC_WIPE_COMPLETED);
        assert!(chain.verify_chain().unwrap().ok);
        assert!(matches!(
            manager.unlock("correct-horse-battery"),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn test_single_pass_request_still_runs_three_passes() {
        let store = Arc::new(MemoryVaultStore::new());
        let (mut manager, entries, chain) = seeded(store.clone());
        let options = WipeOptions {
            passes: 1,
            ..fast()
        };

        let report = PanicWipe::new(&*store, &entries, &chain, &options)
            .perform(&mut manager)
            .unwrap();

        assert_eq!(report.passes, DEFAULT_PASSES);
        let last = chain.blocks().unwrap().pop().unwrap();
        assert_eq!(last.detail, "entries=2 passes=3");
    }

    #[test]
    fn test_wipe_including_audit_log_leaves_nothing() {
        let store = Arc::new(MemoryVaultStore::new());
        let (mut manager, entries, chain) = seeded(store.clone());
        store.set(keys::META, r#"{"biometricEnabled":true}"#).unwrap();
        let options = WipeOptions {
            wipe_audit_log: true,
            ..fast()
        };

        let report = PanicWipe::new(&*store, &entries, &chain, &options)
            .perform(&mut manager)
            .unwrap();

        assert!(report.audit_log_wiped);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_residue_is_reported_and_recorded() {
        let store = Arc::new(StickyStore {
            inner: MemoryVaultStore::new(),
            sticky: keys::SALT,
        });
        let (mut manager, entries, chain) = seeded(store.clone());
        let options = fast();

        let err = PanicWipe::new(&*store, &entries, &chain, &options)
            .perform(&mut manager)
            .unwrap_err();

        match err {
            VaultError::PanicWipeIncomplete { residue } => {
                assert_eq!(residue, vec![keys::SALT.to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!manager.is_unlocked());
        let last = chain.blocks().unwrap().pop().unwrap();
        assert_eq!(last.event, events::PANIC_WIPE_FAILED);
        assert!(last.detail.contains(keys::SALT));
    }

    #[test]
    fn test_wipe_of_empty_vault() {
        let store = Arc::new(MemoryVaultStore::new());
        let entries = EntryStore::new(store.clone());
        let chain = AuditChain::new(store.clone());
        let mut manager = KeyManager::new(store.clone());
        let options = fast();

        let report = PanicWipe::new(&*store, &entries, &chain, &options)
            .perform(&mut manager)
            .unwrap();
        assert_eq!(report.entries_overwritten, 0);
        assert_eq!(chain.len().unwrap(), 1);
    }
}
