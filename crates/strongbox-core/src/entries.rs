//! Journal entry encryption and the append-only entry store.
//!
//! Each entry is encrypted with AES-256-CBC under the master key and
//! authenticated with HMAC-SHA256 over `ivHex|ciphertextB64|timestamp`,
//! keyed by SHA-256 of the master key. Decryption checks the MAC first and
//! never touches the cipher if it does not match.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::primitives::{
    aes256_cbc_decrypt, aes256_cbc_encrypt, b64_decode, b64_encode, format_iso8601,
    hmac_sha256, hmac_sha256_verify, random_bytes, IV_LENGTH,
};
use crate::crypto::MasterKey;
use crate::error::{Result, VaultError};
use crate::store::{keys, VaultStore};

/// An encrypted journal entry as persisted in `vault_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// `<unix ms>-<first 6 hex chars of iv>`
    pub id: String,
    /// 16-byte IV, hex
    pub iv: String,
    /// AES-256-CBC ciphertext, base64
    pub ciphertext: String,
    /// HMAC-SHA256, hex
    pub hmac: String,
    /// ISO-8601 UTC creation time
    pub timestamp: String,
}

impl Entry {
    fn mac_message(iv: &str, ciphertext: &str, timestamp: &str) -> String {
        format!("{}|{}|{}", iv, ciphertext, timestamp)
    }
}

/// Encrypt `plaintext` into a new entry.
pub fn encrypt_entry(key: &MasterKey, plaintext: &str) -> Result<Entry> {
    let now = Utc::now();
    let timestamp = format_iso8601(now);

    let iv = random_bytes(IV_LENGTH)?;
    let ciphertext = b64_encode(&aes256_cbc_encrypt(key.as_bytes(), &iv, plaintext.as_bytes())?);
    let iv = hex::encode(iv);

    let integrity_key = key.integrity_key();
    let tag = hmac_sha256(
        integrity_key.as_slice(),
        Entry::mac_message(&iv, &ciphertext, &timestamp).as_bytes(),
    )?;

    let id = format!("{}-{}", now.timestamp_millis(), &iv[..6]);

    Ok(Entry {
        id,
        iv,
        ciphertext,
        hmac: hex::encode(tag),
        timestamp,
    })
}

/// Recompute the entry MAC and compare it to the stored one in constant time.
///
/// A stored MAC that is not valid hex simply does not verify.
pub fn verify_entry_mac(key: &MasterKey, entry: &Entry) -> Result<bool> {
    let Ok(stored) = hex::decode(&entry.hmac) else {
        return Ok(false);
    };
    let integrity_key = key.integrity_key();
    hmac_sha256_verify(
        integrity_key.as_slice(),
        Entry::mac_message(&entry.iv, &entry.ciphertext, &entry.timestamp).as_bytes(),
        &stored,
    )
}

/// Decrypt an entry after checking its MAC.
///
/// # Errors
///
/// - `IntegrityFailure` if the MAC does not match (nothing is decrypted)
/// - `DecryptionFailure` if the MAC matched but the IV, base64, padding or
///   UTF-8 is invalid
pub fn decrypt_entry(key: &MasterKey, entry: &Entry) -> Result<String> {
    if !verify_entry_mac(key, entry)? {
        return Err(VaultError::IntegrityFailure);
    }

    let iv = hex::decode(&entry.iv).map_err(|_| VaultError::DecryptionFailure)?;
    let ciphertext = b64_decode(&entry.ciphertext).ok_or(VaultError::DecryptionFailure)?;
    let plaintext = aes256_cbc_decrypt(key.as_bytes(), &iv, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| VaultError::DecryptionFailure)
}

/// Append-only, newest-first collection of entries.
pub struct EntryStore {
    store: Arc<dyn VaultStore>,
    writer: Mutex<()>,
}

impl EntryStore {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// All entries, newest first. A missing record is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the stored array cannot be parsed.
    pub fn load(&self) -> Result<Vec<Entry>> {
        match self.store.get(keys::ENTRIES)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                VaultError::StorageUnavailable(format!("Corrupt entry store: {}", e))
            }),
        }
    }

    /// Prepend `entry`.
    pub fn append(&self, entry: Entry) -> Result<()> {
        let _guard = self.lock_writer()?;
        let mut entries = self.load()?;
        debug!(id = %entry.id, "appending entry");
        entries.insert(0, entry);
        self.write(&entries)
    }

    /// Encrypt and append in one step.
    pub fn add(&self, key: &MasterKey, plaintext: &str) -> Result<Entry> {
        let entry = encrypt_entry(key, plaintext)?;
        self.append(entry.clone())?;
        Ok(entry)
    }

    pub fn find(&self, id: &str) -> Result<Option<Entry>> {
        Ok(self.load()?.into_iter().find(|entry| entry.id == id))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Remove the entry with `id`. Used to undo an add whose audit block
    /// could not be written.
    pub(crate) fn discard(&self, id: &str) -> Result<()> {
        let _guard = self.lock_writer()?;
        let mut entries = self.load()?;
        entries.retain(|entry| entry.id != id);
        self.write(&entries)
    }

    /// Replace the whole store. Only the panic wipe rewrites entries.
    pub(crate) fn overwrite_all(&self, entries: &[Entry]) -> Result<()> {
        let _guard = self.lock_writer()?;
        self.write(entries)
    }

    pub(crate) fn clear(&self) -> Result<()> {
        let _guard = self.lock_writer()?;
        self.store.remove(keys::ENTRIES)
    }

    fn write(&self, entries: &[Entry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(keys::ENTRIES, &raw)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| VaultError::StorageUnavailable("entry writer poisoned".to_string()))
    }
}
