use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strongbox_core::crypto::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use strongbox_core::wipe::{DEFAULT_PASSES, DEFAULT_PASS_DELAY};
use strongbox_core::WipeOptions;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StrongboxConfig {
    #[serde(default)]
    pub vault: VaultSection,
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub wipe: WipeSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VaultSection {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecuritySection {
    /// Only affects vaults created from now on.
    #[serde(default = "default_iterations")]
    pub pbkdf2_iterations: u32,
    #[serde(default)]
    pub biometric_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WipeSection {
    #[serde(default = "default_passes")]
    pub passes: u32,
    #[serde(default = "default_pass_delay_ms")]
    pub pass_delay_ms: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExportSection {
    pub directory: Option<String>,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_passes() -> u32 {
    DEFAULT_PASSES
}

fn default_pass_delay_ms() -> u64 {
    DEFAULT_PASS_DELAY.as_millis() as u64
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: default_iterations(),
            biometric_enabled: false,
        }
    }
}

impl Default for WipeSection {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            pass_delay_ms: default_pass_delay_ms(),
        }
    }
}

impl StrongboxConfig {
    pub fn new(vault_path: &Path) -> Self {
        Self {
            vault: VaultSection {
                path: Some(vault_path.to_string_lossy().to_string()),
            },
            ..Self::default()
        }
    }

    /// Reject settings that would weaken or break the vault.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.security.pbkdf2_iterations < MIN_ITERATIONS {
            return Err(anyhow::anyhow!(
                "security.pbkdf2_iterations must be at least {} (got {})",
                MIN_ITERATIONS,
                self.security.pbkdf2_iterations
            ));
        }
        if self.wipe.passes < DEFAULT_PASSES {
            return Err(anyhow::anyhow!(
                "wipe.passes must be at least {} (got {})",
                DEFAULT_PASSES,
                self.wipe.passes
            ));
        }
        Ok(())
    }

    pub fn wipe_options(&self, include_audit: bool) -> WipeOptions {
        WipeOptions {
            passes: self.wipe.passes,
            pass_delay: Duration::from_millis(self.wipe.pass_delay_ms),
            wipe_audit_log: include_audit,
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_vault_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("vault.db"))
}

pub fn read_config(path: &Path) -> anyhow::Result<StrongboxConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    let config: StrongboxConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &StrongboxConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("strongbox"));
        }
    }
    Ok(home_dir()?.join(".config").join("strongbox"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("strongbox"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("strongbox"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
