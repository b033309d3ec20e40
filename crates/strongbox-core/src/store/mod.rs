//! Persistence abstraction for Strongbox.
//!
//! The key manager, entry store and audit chain never touch a backend
//! directly; they share one `Arc<dyn VaultStore>`.
//!
//! ## Layout
//!
//! | key                 | value                                        |
//! |---------------------|----------------------------------------------|
//! | `vault_wrapped_key` | JSON `{ "wrapped": base64, "wrapIvHex": hex }` |
//! | `vault_salt`        | hex                                          |
//! | `vault_iter`        | decimal PBKDF2 iteration count               |
//! | `vault_created`     | ISO-8601                                     |
//! | `vault_entries`     | JSON array of entries, newest first          |
//! | `vault_tamper_log`  | JSON array of audit blocks, newest first     |
//! | `vault_meta`        | JSON `{ "biometricEnabled": bool }`          |

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryVaultStore;
pub use sqlite::SqliteVaultStore;
pub use traits::VaultStore;

/// Storage keys.
pub mod keys {
    pub const WRAPPED_KEY: &str = "vault_wrapped_key";
    pub const SALT: &str = "vault_salt";
    pub const ITERATIONS: &str = "vault_iter";
    pub const CREATED: &str = "vault_created";
    pub const ENTRIES: &str = "vault_entries";
    pub const TAMPER_LOG: &str = "vault_tamper_log";
    pub const META: &str = "vault_meta";

    /// Every record that holds key material.
    pub const KEY_MATERIAL: [&str; 4] = [WRAPPED_KEY, SALT, ITERATIONS, CREATED];
}
