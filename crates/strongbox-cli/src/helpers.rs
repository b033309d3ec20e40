//! Input helpers for the CLI.

use std::io::{self, IsTerminal, Read};

use dialoguer::{Confirm, Password};
use zeroize::Zeroizing;

use crate::constants::ENV_PASSPHRASE;
use crate::errors::CliError;

/// Passphrase from `STRONGBOX_PASSPHRASE`, if set and non-blank.
pub fn env_passphrase() -> Option<Zeroizing<String>> {
    std::env::var(ENV_PASSPHRASE)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Zeroizing::new)
}

/// Prompt for a passphrase.
pub fn prompt_passphrase(interactive: bool) -> anyhow::Result<Zeroizing<String>> {
    if !interactive {
        return Err(CliError::auth_failed_with_hint(
            "No passphrase provided and no TTY available.",
            format!("Hint: Set {} to unlock non-interactively.", ENV_PASSPHRASE),
        )
        .into());
    }
    Password::new()
        .with_prompt("Passphrase")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Passphrase for a new vault: env var, else prompt twice.
pub fn prompt_init_passphrase(interactive: bool) -> anyhow::Result<Zeroizing<String>> {
    if let Some(value) = env_passphrase() {
        return Ok(value);
    }
    if !interactive {
        return Err(CliError::invalid_input(format!(
            "No passphrase provided and no TTY available. Set {}.",
            ENV_PASSPHRASE
        ))
        .into());
    }
    Password::new()
        .with_prompt("New passphrase")
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}

/// Read entry text from `--body` or stdin.
pub fn read_entry_body(no_input: bool, body: Option<String>) -> anyhow::Result<Zeroizing<String>> {
    if let Some(value) = body {
        if value.trim().is_empty() {
            return Err(CliError::invalid_input("--body cannot be empty").into());
        }
        return Ok(Zeroizing::new(value));
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        if no_input {
            return Err(CliError::invalid_input("--no-input requires --body or stdin").into());
        }
        eprintln!("Type the entry, then press Ctrl-D:");
    }

    let mut buffer = Zeroizing::new(String::new());
    stdin
        .lock()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
    let trimmed = Zeroizing::new(buffer.trim_end().to_string());
    if trimmed.is_empty() {
        return Err(CliError::invalid_input("Entry body is empty").into());
    }
    Ok(trimmed)
}

/// Ask a yes/no question; `false` without a TTY.
pub fn confirm(prompt: &str, interactive: bool) -> anyhow::Result<bool> {
    if !interactive {
        return Ok(false);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read confirmation: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_flag_is_used() {
        let body = read_entry_body(true, Some("hello".to_string())).unwrap();
        assert_eq!(body.as_str(), "hello");
    }

    #[test]
    fn test_blank_body_flag_rejected() {
        let err = read_entry_body(true, Some("   ".to_string())).unwrap_err();
        assert!(err.to_string().contains("--body cannot be empty"));
    }

    #[test]
    fn test_prompt_without_tty_fails() {
        let err = prompt_passphrase(false).unwrap_err();
        assert!(err.to_string().contains(ENV_PASSPHRASE));
    }

    #[test]
    fn test_confirm_without_tty_is_no() {
        assert!(!confirm("Wipe?", false).unwrap());
    }
}
