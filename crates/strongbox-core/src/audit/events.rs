//! Event names recorded in the audit chain.

pub const VAULT_CREATED: &str = "vault_created";
pub const UNLOCKED: &str = "unlocked";
pub const UNLOCK_FAILED: &str = "unlock_failed";
pub const UNLOCK_BLOCKED: &str = "unlock_blocked";
pub const LOCKED: &str = "locked";
pub const ENTRY_ADDED: &str = "entry_added";
pub const ENTRY_VIEWED: &str = "entry_viewed";
pub const INTEGRITY_FAILURE: &str = "integrity_failure";
pub const DECRYPTION_FAILURE: &str = "decryption_failure";
pub const CHAIN_VERIFIED: &str = "chain_verified";
pub const CHAIN_EXPORTED: &str = "chain_exported";
pub const BIOMETRIC_CHANGED: &str = "biometric_changed";
pub const PANIC_WIPE_COMPLETED: &str = "panic_wipe_completed";
pub const PANIC_WIPE_FAILED: &str = "panic_wipe_failed";

/// Event name given to migrated records that carried none.
pub const UNKNOWN: &str = "unknown";
