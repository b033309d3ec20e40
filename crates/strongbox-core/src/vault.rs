//! The vault: key manager, entry store and audit chain over one store.
//!
//! Every security-relevant operation is recorded in the audit chain here,
//! so the components themselves stay unaware of auditing.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{
    events, AuditBlock, AuditChain, ChainExport, ChainVerification, ExportPaths, NewEvent,
};
use crate::crypto::primitives::sha256_hex;
use crate::entries::{decrypt_entry, verify_entry_mac, Entry, EntryStore};
use crate::error::{Result, VaultError};
use crate::keys::{KeyManager, WrappedKeyRecord};
use crate::store::{keys, VaultStore};
use crate::wipe::{PanicWipe, WipeOptions, WipeReport};

/// External check consulted before unlocking when biometrics are enabled.
pub trait BiometricGate: Send + Sync {
    fn permit(&self) -> bool;
}

/// Gate that always permits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl BiometricGate for AllowAll {
    fn permit(&self) -> bool {
        true
    }
}

/// Persisted vault settings (`vault_meta`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMeta {
    #[serde(default)]
    pub biometric_enabled: bool,
}

/// Result of [`Vault::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultHealth {
    pub initialized: bool,
    pub entry_count: usize,
    /// Ids of entries whose MAC does not verify. `None` while locked.
    pub failing_entries: Option<Vec<String>>,
    pub chain_blocks: usize,
    pub chain_breaks: u32,
    pub broken_seqs: Vec<u64>,
    pub head: Option<String>,
}

impl VaultHealth {
    pub fn is_healthy(&self) -> bool {
        self.chain_breaks == 0
            && self
                .failing_entries
                .as_ref()
                .map_or(true, |failing| failing.is_empty())
    }
}

pub struct Vault {
    store: Arc<dyn VaultStore>,
    keys: KeyManager,
    entries: EntryStore,
    chain: AuditChain,
    wipe: WipeOptions,
    gate: Box<dyn BiometricGate>,
}

impl Vault {
    pub fn open(store: Arc<dyn VaultStore>) -> Self {
        Self {
            keys: KeyManager::new(store.clone()),
            entries: EntryStore::new(store.clone()),
            chain: AuditChain::new(store.clone()),
            store,
            wipe: WipeOptions::default(),
            gate: Box::new(AllowAll),
        }
    }

    /// PBKDF2 iterations for a vault created by this handle.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.keys = self.keys.with_iterations(iterations);
        self
    }

    pub fn with_wipe_options(mut self, options: WipeOptions) -> Self {
        self.wipe = options;
        self
    }

    pub fn with_biometric_gate(mut self, gate: impl BiometricGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.keys.is_initialized()
    }

    pub fn is_unlocked(&self) -> bool {
        self.keys.is_unlocked()
    }

    #[cfg(test)]
    pub(crate) fn with_test_iterations(mut self, iterations: u32) -> Self {
        self.keys = self.keys.with_test_iterations(iterations);
        self
    }

    /// Create the vault. The handle is unlocked afterwards.
    ///
    /// If the `vault_created` block cannot be written, the key material is
    /// removed again and the handle stays locked.
    pub fn create(&mut self, passphrase: &str) -> Result<WrappedKeyRecord> {
        let record = self.keys.create_vault(passphrase)?;
        if let Err(e) = self.chain.append_event(NewEvent::new(
            events::VAULT_CREATED,
            format!("iterations={}", record.iterations),
        )) {
            self.keys.lock();
            if let Err(rollback) = self.store.remove_many(&keys::KEY_MATERIAL) {
                warn!(error = %rollback, "could not remove key material after failed create");
            }
            return Err(e);
        }
        info!("vault created");
        Ok(record)
    }

    /// Unlock with `passphrase`.
    ///
    /// Failed and blocked attempts are recorded before the error is returned.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if no vault exists
    /// - `BiometricDenied` if biometrics are enabled and the gate refuses
    /// - `WrongPassphrase` if the key cannot be unwrapped
    pub fn unlock(&mut self, passphrase: &str) -> Result<()> {
        if !self.keys.is_initialized()? {
            return Err(VaultError::NotInitialized);
        }

        if self.meta()?.biometric_enabled && !self.gate.permit() {
            warn!("unlock blocked by biometric gate");
            self.chain
                .append_event(NewEvent::new(events::UNLOCK_BLOCKED, "biometric"))?;
            return Err(VaultError::BiometricDenied);
        }

        match self.keys.unlock(passphrase) {
            Ok(_) => {
                self.chain.append_event(NewEvent::new(events::UNLOCKED, ""))?;
                info!("vault unlocked");
                Ok(())
            }
            Err(VaultError::WrongPassphrase) => {
                warn!("unlock failed");
                self.chain
                    .append_event(NewEvent::new(events::UNLOCK_FAILED, "wrong passphrase"))?;
                Err(VaultError::WrongPassphrase)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the master key. Records `locked` only if the vault was unlocked.
    pub fn lock(&mut self) -> Result<()> {
        if !self.keys.is_unlocked() {
            return Ok(());
        }
        self.keys.lock();
        self.chain.append_event(NewEvent::new(events::LOCKED, ""))?;
        info!("vault locked");
        Ok(())
    }

    /// Encrypt and store an entry, then record `entry_added`.
    ///
    /// The entry is removed again if its audit block cannot be written.
    pub fn add_entry(&self, text: &str) -> Result<Entry> {
        let key = self.keys.master_key()?;
        let entry = self.entries.add(key, text)?;
        if let Err(e) = self
            .chain
            .append_event(NewEvent::new(events::ENTRY_ADDED, "").with_id(&entry.id))
        {
            if let Err(rollback) = self.entries.discard(&entry.id) {
                warn!(id = %entry.id, error = %rollback, "could not remove unaudited entry");
            }
            return Err(e);
        }
        Ok(entry)
    }

    /// Stored entries, newest first. Needs no key: nothing is decrypted.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        self.entries.load()
    }

    /// Decrypt one entry. The outcome is recorded either way.
    ///
    /// # Errors
    ///
    /// - `Locked` if the vault is locked
    /// - `EntryNotFound` if no entry has this id
    /// - `IntegrityFailure` / `DecryptionFailure` from the entry checks
    pub fn read_entry(&self, id: &str) -> Result<String> {
        let key = self.keys.master_key()?;
        let entry = self
            .entries
            .find(id)?
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))?;

        let outcome = decrypt_entry(key, &entry);
        let event = match &outcome {
            Ok(_) => Some(events::ENTRY_VIEWED),
            Err(VaultError::IntegrityFailure) => Some(events::INTEGRITY_FAILURE),
            Err(VaultError::DecryptionFailure) => Some(events::DECRYPTION_FAILURE),
            Err(_) => None,
        };
        let Some(event) = event else {
            return outcome;
        };
        if outcome.is_err() {
            warn!(id = %entry.id, event, "entry failed to open");
        }
        self.chain
            .append_event(NewEvent::new(event, "").with_id(&entry.id))?;
        outcome
    }

    /// Verify the chain, then record `chain_verified`.
    ///
    /// The returned result describes the chain as it was before the new
    /// block was appended.
    pub fn verify_chain(&self) -> Result<ChainVerification> {
        let verification = self.chain.verify_chain()?;
        let detail = if verification.ok {
            "ok".to_string()
        } else {
            format!("breaks={}", verification.breaks)
        };
        self.chain
            .append_event(NewEvent::new(events::CHAIN_VERIFIED, detail))?;
        Ok(verification)
    }

    pub fn head(&self) -> Result<Option<String>> {
        self.chain.head_fingerprint()
    }

    /// Audit blocks, oldest first.
    pub fn audit_blocks(&self) -> Result<Vec<AuditBlock>> {
        self.chain.blocks()
    }

    /// Migrated export of the chain, without writing it anywhere.
    pub fn export_chain_files(&self) -> Result<ChainExport> {
        self.chain.ensure_migrated()?;
        self.chain.export_chain_files()
    }

    /// Write the chain export into `dir` and record `chain_exported`.
    ///
    /// The exported files do not contain the `chain_exported` block itself.
    pub fn export_chain(&self, dir: &Path, name: &str) -> Result<ExportPaths> {
        let export = self.export_chain_files()?;
        let paths = export.write_to(dir, name)?;
        self.chain.append_event(
            NewEvent::new(events::CHAIN_EXPORTED, format!("count={}", export.manifest.count))
                .with_file(name)
                .with_hash(sha256_hex(export.jsonl.as_bytes())),
        )?;
        info!(name, "chain exported");
        Ok(paths)
    }

    /// Destroy entries and key material, then record the outcome.
    pub fn panic_wipe(&mut self) -> Result<WipeReport> {
        PanicWipe::new(&*self.store, &self.entries, &self.chain, &self.wipe)
            .perform(&mut self.keys)
    }

    /// Stored settings; defaults when never written.
    pub fn meta(&self) -> Result<VaultMeta> {
        match self.store.get(keys::META)? {
            None => Ok(VaultMeta::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                VaultError::StorageUnavailable(format!("Corrupt vault metadata: {}", e))
            }),
        }
    }

    /// Turn the biometric gate on or off. Requires an unlocked vault.
    pub fn set_biometric_enabled(&self, enabled: bool) -> Result<()> {
        self.keys.master_key()?;
        let meta = VaultMeta {
            biometric_enabled: enabled,
        };
        self.store
            .set(keys::META, &serde_json::to_string(&meta)?)?;
        self.chain.append_event(NewEvent::new(
            events::BIOMETRIC_CHANGED,
            if enabled { "enabled" } else { "disabled" },
        ))?;
        Ok(())
    }

    /// Verify the chain and, if unlocked, every entry MAC. Records nothing.
    pub fn check(&self) -> Result<VaultHealth> {
        let entries = self.entries.load()?;
        let failing_entries = match self.keys.master_key() {
            Ok(key) => {
                let mut failing = Vec::new();
                for entry in &entries {
                    if !verify_entry_mac(key, entry)? {
                        failing.push(entry.id.clone());
                    }
                }
                Some(failing)
            }
            Err(_) => None,
        };
        let verification = self.chain.verify_chain()?;

        Ok(VaultHealth {
            initialized: self.keys.is_initialized()?,
            entry_count: entries.len(),
            failing_entries,
            chain_blocks: verification.details.len(),
            chain_breaks: verification.breaks,
            broken_seqs: verification.broken_seqs(),
            head: verification.head,
        })
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("unlocked", &self.keys.is_unlocked())
            .field("wipe", &self.wipe)
            .finish_non_exhaustive()
    }
}
