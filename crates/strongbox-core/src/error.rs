//! Error types for Strongbox core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-friendly messages.

use thiserror::Error;

/// Result type alias for Strongbox operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for Strongbox operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Passphrase below the minimum length at vault creation
    #[error("Passphrase too weak: {0}")]
    WeakPassphrase(String),

    /// Unwrapping the master key failed. Carries no detail on purpose.
    #[error("Incorrect passphrase")]
    WrongPassphrase,

    /// No wrapped key record exists in storage
    #[error("Vault not initialized")]
    NotInitialized,

    /// A wrapped key record already exists
    #[error("Vault already initialized")]
    AlreadyInitialized,

    /// Operation needs the master key but the session is locked
    #[error("Vault is locked")]
    Locked,

    /// The biometric gate refused to release the key
    #[error("Biometric check denied")]
    BiometricDenied,

    /// Entry HMAC mismatch
    #[error("Entry integrity check failed")]
    IntegrityFailure,

    /// Ciphertext or padding invalid after the HMAC passed
    #[error("Entry decryption failed")]
    DecryptionFailure,

    /// One or more audit blocks failed verification
    #[error("Audit chain integrity break ({breaks} block(s))")]
    ChainIntegrityBreak { breaks: u32 },

    /// Residue found after a panic wipe
    #[error("Panic wipe incomplete: {residue:?} still present")]
    PanicWipeIncomplete { residue: Vec<String> },

    /// Entry not found by ID
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Persistence collaborator failure
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// RNG, hash or cipher backend failure
    #[error("Crypto primitive unavailable: {0}")]
    CryptoPrimitiveUnavailable(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VaultError {
    /// Whether this failure is a security-relevant event that belongs in the audit chain.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            VaultError::WrongPassphrase
                | VaultError::BiometricDenied
                | VaultError::IntegrityFailure
                | VaultError::DecryptionFailure
                | VaultError::PanicWipeIncomplete { .. }
        )
    }

    /// Whether the failure came from the persistence layer and may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::StorageUnavailable(_) | VaultError::Sqlite { .. } | VaultError::Io { .. }
        )
    }
}
