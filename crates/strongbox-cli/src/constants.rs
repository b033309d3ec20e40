//! Environment variable names and exit codes.

/// Passphrase used instead of prompting.
pub const ENV_PASSPHRASE: &str = "STRONGBOX_PASSPHRASE";

/// Config file override.
pub const ENV_CONFIG: &str = "STRONGBOX_CONFIG";

/// Log filter for stderr diagnostics (`tracing` directives).
pub const ENV_LOG: &str = "STRONGBOX_LOG";

/// Maximum passphrase prompts in one interactive session.
pub const MAX_PASSPHRASE_ATTEMPTS: u32 = 3;

pub mod exit_codes {
    /// Any failure without a more specific code.
    pub const FAILURE: i32 = 1;

    /// Resource not found (vault, entry).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Authentication failed (wrong passphrase, biometric denial).
    pub const AUTH_FAILED: i32 = 5;

    /// Entry MAC or audit chain verification failed.
    pub const INTEGRITY_FAILED: i32 = 6;
}
