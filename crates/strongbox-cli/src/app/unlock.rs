//! Unlocking with passphrase retry.

use strongbox_core::{Vault, VaultError};
use tracing::debug;

use crate::constants::MAX_PASSPHRASE_ATTEMPTS;
use crate::errors::CliError;
use crate::helpers::{env_passphrase, prompt_passphrase};

/// Unlock `vault`, using `STRONGBOX_PASSPHRASE` or prompting.
///
/// The env var gets exactly one attempt. Prompts get up to three on a TTY.
pub fn unlock_with_retry(vault: &mut Vault, interactive: bool) -> anyhow::Result<()> {
    if let Some(passphrase) = env_passphrase() {
        debug!("unlocking with passphrase from environment");
        return vault.unlock(&passphrase).map_err(unlock_error);
    }

    let max_attempts = if interactive { MAX_PASSPHRASE_ATTEMPTS } else { 1 };
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let passphrase = prompt_passphrase(interactive)?;
        match vault.unlock(&passphrase) {
            Ok(()) => return Ok(()),
            Err(VaultError::WrongPassphrase) => {
                let remaining = max_attempts.saturating_sub(attempts);
                if remaining == 0 {
                    return Err(CliError::auth_failed_with_hint(
                        "Too many failed passphrase attempts.",
                        "Hint: A forgotten passphrase cannot be recovered.",
                    )
                    .into());
                }
                eprintln!(
                    "Incorrect passphrase. {} attempt{} remaining.",
                    remaining,
                    if remaining == 1 { "" } else { "s" }
                );
            }
            Err(err) => return Err(unlock_error(err)),
        }
    }
}

fn unlock_error(err: VaultError) -> anyhow::Error {
    match err {
        VaultError::WrongPassphrase => CliError::auth_failed("Incorrect passphrase.").into(),
        VaultError::BiometricDenied => CliError::auth_failed_with_hint(
            "Biometric check denied.",
            "Hint: Biometric lock is on; unlock from an interactive terminal.",
        )
        .into(),
        VaultError::NotInitialized => CliError::not_found(
            "Vault not initialized.",
            "Hint: Run `strongbox init` to create a vault.",
        )
        .into(),
        other => other.into(),
    }
}
