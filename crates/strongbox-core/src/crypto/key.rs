//! Key material types and passphrase key derivation.
//!
//! Both the master key and the passphrase-derived wrap key live in
//! fixed-size buffers that are zeroized when dropped. Neither type is
//! `Clone`, so the bytes are never duplicated behind the caller's back.

use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::crypto::primitives::{fill_random, pbkdf2_sha256, sha256, KEY_LENGTH};
use crate::error::{Result, VaultError};

/// PBKDF2 iteration count for new vaults.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Floor for the iteration count of a new vault.
pub const MIN_ITERATIONS: u32 = DEFAULT_ITERATIONS;

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// The symmetric key all journal entries are encrypted under.
#[derive(ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Generate a fresh random master key.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_LENGTH];
        fill_random(&mut key)?;
        Ok(Self { key })
    }

    /// Build a key from unwrapped bytes. Anything but 32 bytes is rejected.
    pub(crate) fn from_slice(bytes: &[u8]) -> Option<Self> {
        let key: [u8; KEY_LENGTH] = bytes.try_into().ok()?;
        Some(Self { key })
    }

    /// Raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate cipher operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Key used for entry HMACs: SHA-256 of the master key bytes.
    pub(crate) fn integrity_key(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(sha256(&self.key))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A key derived from a passphrase, used only to wrap the master key.
#[derive(ZeroizeOnDrop)]
pub struct WrapKey {
    key: [u8; KEY_LENGTH],
}

impl WrapKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for WrapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a wrap key with PBKDF2-HMAC-SHA256.
///
/// # Security
///
/// - Same passphrase + salt + iterations always produces the same key
/// - The salt and iteration count are stored next to the wrapped key
///
/// # Examples
///
/// ```
/// use strongbox_core::crypto::derive_wrap_key;
///
/// let salt = [3u8; 16];
/// let key = derive_wrap_key("my-long-passphrase", &salt, 10_000).unwrap();
/// assert_eq!(key.as_bytes().len(), 32);
/// ```
pub fn derive_wrap_key(passphrase: &str, salt: &[u8], iterations: u32) -> Result<WrapKey> {
    if passphrase.is_empty() {
        return Err(VaultError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }
    if salt.len() < SALT_LENGTH {
        return Err(VaultError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            SALT_LENGTH
        )));
    }
    if iterations == 0 {
        return Err(VaultError::InvalidInput(
            "Iteration count must be positive".to_string(),
        ));
    }

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_sha256(passphrase.as_bytes(), salt, iterations, &mut key);
    Ok(WrapKey { key })
}
