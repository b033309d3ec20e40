//! Master key lifecycle: creation, wrapping, unlock and lock.
//!
//! The master key is generated once, wrapped under a PBKDF2-derived key and
//! persisted only in wrapped form. Unlocking re-derives the wrap key from the
//! stored salt and iteration count.
//!
//! Every failure on the unwrap path (KDF input rejected, bad padding, wrong
//! plaintext length) collapses into a single private `UnwrapFailure` before
//! it is turned into `VaultError::WrongPassphrase`, so callers cannot tell
//! which check failed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::key::SALT_LENGTH;
use crate::crypto::primitives::{
    aes256_cbc_decrypt, aes256_cbc_encrypt, b64_decode, b64_encode, now_iso8601, random_bytes,
    IV_LENGTH,
};
use crate::crypto::{
    derive_wrap_key, validate_passphrase, MasterKey, DEFAULT_ITERATIONS, MIN_ITERATIONS,
};
use crate::error::{Result, VaultError};
use crate::store::{keys, VaultStore};

/// The persisted, passphrase-wrapped master key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKeyRecord {
    pub wrapped_ciphertext: Vec<u8>,
    pub wrap_iv: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub created_at: String,
}

/// JSON shape of `vault_wrapped_key`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWrappedKey {
    wrapped: String,
    wrap_iv_hex: String,
}

/// The only error the unwrap path can produce.
struct UnwrapFailure;

impl From<UnwrapFailure> for VaultError {
    fn from(_: UnwrapFailure) -> Self {
        VaultError::WrongPassphrase
    }
}

/// Wrap `master` under a key derived from `passphrase` with fresh salt and IV.
pub fn wrap_master_key(
    passphrase: &str,
    master: &MasterKey,
    iterations: u32,
) -> Result<WrappedKeyRecord> {
    let salt = random_bytes(SALT_LENGTH)?;
    let wrap_iv = random_bytes(IV_LENGTH)?;
    let wrap_key = derive_wrap_key(passphrase, &salt, iterations)?;
    let wrapped_ciphertext = aes256_cbc_encrypt(wrap_key.as_bytes(), &wrap_iv, master.as_bytes())?;

    Ok(WrappedKeyRecord {
        wrapped_ciphertext,
        wrap_iv,
        salt,
        iterations,
        created_at: now_iso8601(),
    })
}

fn try_unwrap(
    passphrase: &str,
    record: &WrappedKeyRecord,
) -> std::result::Result<MasterKey, UnwrapFailure> {
    let wrap_key =
        derive_wrap_key(passphrase, &record.salt, record.iterations).map_err(|_| UnwrapFailure)?;
    let plaintext = Zeroizing::new(
        aes256_cbc_decrypt(wrap_key.as_bytes(), &record.wrap_iv, &record.wrapped_ciphertext)
            .map_err(|_| UnwrapFailure)?,
    );
    MasterKey::from_slice(&plaintext).ok_or(UnwrapFailure)
}

/// Owns the unlocked session's master key.
pub struct KeyManager {
    store: Arc<dyn VaultStore>,
    iterations: u32,
    session: Option<MasterKey>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self {
            store,
            iterations: DEFAULT_ITERATIONS,
            session: None,
        }
    }

    /// Raise the PBKDF2 iteration count used for new vaults.
    ///
    /// Counts below [`MIN_ITERATIONS`] are raised to it. Unlock always uses
    /// the count stored with the record.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(MIN_ITERATIONS);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_test_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Create the vault's master key and persist it wrapped under `passphrase`.
    ///
    /// The session is unlocked afterwards.
    ///
    /// # Errors
    ///
    /// - `WeakPassphrase` if the passphrase is shorter than 12 characters
    /// - `AlreadyInitialized` if a wrapped key already exists
    /// - storage errors if the record cannot be written (nothing is committed)
    pub fn create_vault(&mut self, passphrase: &str) -> Result<WrappedKeyRecord> {
        validate_passphrase(passphrase)?;
        if self.store.contains(keys::WRAPPED_KEY)? {
            return Err(VaultError::AlreadyInitialized);
        }

        let master = MasterKey::generate()?;
        let record = wrap_master_key(passphrase, &master, self.iterations)?;
        self.persist_record(&record)?;
        self.session = Some(master);

        info!(iterations = record.iterations, "vault created");
        Ok(record)
    }

    /// Unwrap a master key from `record`.
    ///
    /// # Errors
    ///
    /// Returns `WrongPassphrase` for every failure; no detail is exposed.
    pub fn unwrap(passphrase: &str, record: &WrappedKeyRecord) -> Result<MasterKey> {
        Ok(try_unwrap(passphrase, record)?)
    }

    /// Load the stored record and unlock the session with `passphrase`.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if no wrapped key is stored
    /// - `WrongPassphrase` if unwrapping fails
    pub fn unlock(&mut self, passphrase: &str) -> Result<&MasterKey> {
        let record = self.load_record()?.ok_or(VaultError::NotInitialized)?;
        let master = Self::unwrap(passphrase, &record)?;
        debug!("master key unwrapped");
        Ok(self.session.insert(master))
    }

    /// Drop the in-memory master key. Idempotent.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            debug!("session locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// The unlocked master key.
    pub fn master_key(&self) -> Result<&MasterKey> {
        self.session.as_ref().ok_or(VaultError::Locked)
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.store.contains(keys::WRAPPED_KEY)
    }

    /// Read the wrapped key record, or `None` if the vault was never created.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the record is present but incomplete or
    /// cannot be decoded.
    pub fn load_record(&self) -> Result<Option<WrappedKeyRecord>> {
        let Some(wrapped_json) = self.store.get(keys::WRAPPED_KEY)? else {
            return Ok(None);
        };
        let corrupt =
            |what: &str| VaultError::StorageUnavailable(format!("Corrupt key record: {}", what));

        let stored: StoredWrappedKey =
            serde_json::from_str(&wrapped_json).map_err(|_| corrupt("wrapped key JSON"))?;
        let wrapped_ciphertext =
            b64_decode(&stored.wrapped).ok_or_else(|| corrupt("wrapped key"))?;
        let wrap_iv = hex::decode(&stored.wrap_iv_hex).map_err(|_| corrupt("wrap IV"))?;

        let salt_hex = self
            .store
            .get(keys::SALT)?
            .ok_or_else(|| corrupt("salt missing"))?;
        let salt = hex::decode(salt_hex.trim()).map_err(|_| corrupt("salt"))?;

        let iterations = self
            .store
            .get(keys::ITERATIONS)?
            .ok_or_else(|| corrupt("iteration count missing"))?
            .trim()
            .parse::<u32>()
            .map_err(|_| corrupt("iteration count"))?;

        let created_at = self.store.get(keys::CREATED)?.unwrap_or_default();

        Ok(Some(WrappedKeyRecord {
            wrapped_ciphertext,
            wrap_iv,
            salt,
            iterations,
            created_at,
        }))
    }

    fn persist_record(&self, record: &WrappedKeyRecord) -> Result<()> {
        let wrapped_json = serde_json::to_string(&StoredWrappedKey {
            wrapped: b64_encode(&record.wrapped_ciphertext),
            wrap_iv_hex: hex::encode(&record.wrap_iv),
        })?;
        let salt_hex = hex::encode(&record.salt);
        let iterations = record.iterations.to_string();

        self.store.set_many(&[
            (keys::WRAPPED_KEY, wrapped_json.as_str()),
            (keys::SALT, salt_hex.as_str()),
            (keys::ITERATIONS, iterations.as_str()),
            (keys::CREATED, record.created_at.as_str()),
        ])
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("iterations", &self.iterations)
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}
