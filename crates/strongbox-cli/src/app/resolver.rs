//! Path resolution for config and vault files.

use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{default_config_path, default_vault_path, StrongboxConfig};
use crate::constants::ENV_CONFIG;

/// Resolve the config file path, checking `STRONGBOX_CONFIG` first.
pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(ENV_CONFIG) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Resolve the vault path: `--vault` / `STRONGBOX_VAULT`, then config, then the XDG default.
pub fn resolve_vault_path(cli: &Cli, config: &StrongboxConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli.vault.clone() {
        return Ok(path);
    }
    if let Some(path) = config.vault.path.as_deref() {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    default_vault_path()
}

/// Message when no vault exists at `path`.
pub fn missing_vault_message(path: &Path) -> String {
    format!("No vault found at {}", path.display())
}
