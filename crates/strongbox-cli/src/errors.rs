//! CLI error types and exit code mapping.

use std::fmt;

use strongbox_core::VaultError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (vault, entry)
    NotFound { message: String, hint: String },

    /// Authentication failed (wrong passphrase, too many attempts)
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Invalid user input
    InvalidInput(String),

    /// Verification found damage
    IntegrityFailed(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => write!(f, "{}\n{}", message, hint),
            CliError::AuthFailed { message, hint } => match hint {
                Some(h) => write!(f, "{}\n{}", message, h),
                None => write!(f, "{}", message),
            },
            CliError::InvalidInput(message) | CliError::IntegrityFailed(message) => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: None,
        }
    }

    pub fn auth_failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn integrity_failed(message: impl Into<String>) -> Self {
        CliError::IntegrityFailed(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::IntegrityFailed(_) => exit_codes::INTEGRITY_FAILED,
        }
    }
}

fn vault_exit_code(err: &VaultError) -> i32 {
    match err {
        VaultError::NotInitialized | VaultError::EntryNotFound(_) => exit_codes::NOT_FOUND,
        VaultError::WrongPassphrase | VaultError::BiometricDenied | VaultError::Locked => {
            exit_codes::AUTH_FAILED
        }
        VaultError::WeakPassphrase(_)
        | VaultError::AlreadyInitialized
        | VaultError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        VaultError::IntegrityFailure
        | VaultError::DecryptionFailure
        | VaultError::ChainIntegrityBreak { .. } => exit_codes::INTEGRITY_FAILED,
        _ => exit_codes::FAILURE,
    }
}

/// Exit code for an error returned from a command handler.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    if let Some(vault_err) = err.downcast_ref::<VaultError>() {
        return vault_exit_code(vault_err);
    }
    exit_codes::FAILURE
}
