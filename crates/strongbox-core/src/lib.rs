//! # Strongbox Core
//!
//! Core library for Strongbox - an offline, encrypted journal with a
//! tamper-evident audit chain.
//!
//! ## Architecture
//!
//! - **crypto**: primitives, master key, passphrase-derived wrap key
//! - **keys**: master key creation, wrapping and the unlocked session
//! - **entries**: encrypt-then-MAC journal entries and their store
//! - **audit**: hash-linked audit blocks, verification, migration, export
//! - **wipe**: panic wipe of entries and key material
//! - **store**: `VaultStore` trait with SQLite and in-memory backends
//! - **vault**: facade that wires the above and records audit events

pub mod audit;
pub mod crypto;
pub mod entries;
pub mod error;
pub mod fs;
pub mod keys;
pub mod store;
pub mod vault;
pub mod wipe;

pub use audit::{AuditBlock, AuditChain, ChainVerification, NewEvent};
pub use entries::{Entry, EntryStore};
pub use error::{Result, VaultError};
pub use keys::{KeyManager, WrappedKeyRecord};
pub use store::{MemoryVaultStore, SqliteVaultStore, VaultStore};
pub use vault::{AllowAll, BiometricGate, Vault, VaultHealth, VaultMeta};
pub use wipe::{WipeOptions, WipeReport};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
