//! Passphrase validation.
//!
//! Enforces minimum security requirements for new vault passphrases.

use crate::error::{Result, VaultError};

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LENGTH: usize = 12;

/// Validate passphrase meets minimum security requirements.
///
/// # Requirements
///
/// - At least 12 characters long
/// - Not empty or only whitespace
///
/// # Examples
///
/// ```
/// use strongbox_core::crypto::validate_passphrase;
///
/// assert!(validate_passphrase("correct-horse-battery").is_ok());
/// assert!(validate_passphrase("short").is_err());
/// ```
pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.trim().is_empty() {
        return Err(VaultError::WeakPassphrase(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    let length = passphrase.chars().count();
    if length < MIN_PASSPHRASE_LENGTH {
        return Err(VaultError::WeakPassphrase(format!(
            "Passphrase must be at least {} characters (got {})",
            MIN_PASSPHRASE_LENGTH, length
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_passphrase() {
        assert!(validate_passphrase("correct-horse-battery").is_ok());
        assert!(validate_passphrase("longer passphrase with spaces and symbols!@#").is_ok());
    }

    #[test]
    fn test_passphrase_too_short() {
        let result = validate_passphrase("eleven-char");
        assert!(matches!(result, Err(VaultError::WeakPassphrase(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least 12 characters"));
    }

    #[test]
    fn test_passphrase_empty() {
        assert!(validate_passphrase("").is_err());
        assert!(validate_passphrase("            ").is_err());
        assert!(validate_passphrase("\n\t").is_err());
    }

    #[test]
    fn test_passphrase_exactly_min_length() {
        let exactly_12 = "exactly12chr";
        assert_eq!(exactly_12.len(), 12);
        assert!(validate_passphrase(exactly_12).is_ok());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 11 characters, 22 bytes
        assert!(validate_passphrase("ééééééééééé").is_err());
    }
}
