//! Cryptographic operations for Strongbox.
//!
//! ## Security Model
//!
//! - Master key: 32 random bytes, never persisted unwrapped
//! - Wrapping: PBKDF2-HMAC-SHA256 (100k iterations) → AES-256-CBC
//! - Entries: AES-256-CBC + HMAC-SHA256 (encrypt-then-MAC)
//! - Key material zeroized from memory on drop
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the vault database
//! - Offline brute-force attacks on the passphrase
//! - Silent modification of stored entries or audit records
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Access to an unlocked session / memory

pub mod key;
pub mod passphrase;
pub mod primitives;

pub use key::{derive_wrap_key, MasterKey, WrapKey, DEFAULT_ITERATIONS, MIN_ITERATIONS};
pub use passphrase::{validate_passphrase, MIN_PASSPHRASE_LENGTH};
