//! Application context for the Strongbox CLI.
//!
//! Combines CLI arguments with lazily-loaded configuration.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use strongbox_core::{SqliteVaultStore, Vault};
use tracing::debug;

use crate::cli::Cli;
use crate::config::{read_config, StrongboxConfig};
use crate::errors::CliError;
use crate::ui::UiContext;

use super::gate::PresenceGate;
use super::resolver::{missing_vault_message, resolve_config_path, resolve_vault_path};
use super::unlock::unlock_with_retry;

/// An opened vault and the store under it.
pub struct OpenVault {
    pub path: PathBuf,
    pub store: Arc<SqliteVaultStore>,
    pub vault: Vault,
}

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<StrongboxConfig>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Config from disk, or defaults when no config file exists.
    pub fn config(&self) -> anyhow::Result<&StrongboxConfig> {
        self.config.get_or_try_init(|| {
            let path = resolve_config_path()?;
            if path.exists() {
                debug!(path = %path.display(), "loading config");
                read_config(&path)
            } else {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(StrongboxConfig::default())
            }
        })
    }

    pub fn vault_path(&self) -> anyhow::Result<PathBuf> {
        resolve_vault_path(self.cli, self.config()?)
    }

    pub fn ui(&self, json: bool) -> UiContext {
        UiContext::from_env(json)
    }

    /// Whether prompts may be shown.
    pub fn interactive(&self, no_input: bool) -> bool {
        !no_input && std::io::stdin().is_terminal()
    }

    /// Open the vault file at the resolved path with settings from config.
    pub fn open_vault(&self, no_input: bool) -> anyhow::Result<OpenVault> {
        let path = self.vault_path()?;
        if !path.exists() {
            return Err(CliError::not_found(
                missing_vault_message(&path),
                "Hint: Run `strongbox init` to create a vault, or pass --vault <PATH>.",
            )
            .into());
        }
        self.open_vault_at(path, no_input)
    }

    /// Open (creating the file if needed) the vault at `path`.
    pub fn open_vault_at(&self, path: PathBuf, no_input: bool) -> anyhow::Result<OpenVault> {
        let config = self.config()?;
        let store = Arc::new(SqliteVaultStore::open(&path)?);
        let vault = Vault::open(store.clone())
            .with_iterations(config.security.pbkdf2_iterations)
            .with_wipe_options(config.wipe_options(false))
            .with_biometric_gate(PresenceGate::new(self.interactive(no_input)));
        debug!(path = %path.display(), "vault opened");
        Ok(OpenVault { path, store, vault })
    }

    /// Open the vault and unlock it.
    pub fn unlock_vault(&self, no_input: bool) -> anyhow::Result<OpenVault> {
        let mut opened = self.open_vault(no_input)?;
        unlock_with_retry(&mut opened.vault, self.interactive(no_input))?;
        Ok(opened)
    }
}
