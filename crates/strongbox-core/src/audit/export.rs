//! Chain export: JSONL blocks plus a manifest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audit::chain::ChainVerification;
use crate::crypto::primitives::now_iso8601;
use crate::error::{Result, VaultError};
use crate::fs::write_atomic;

/// Algorithms named in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithms {
    pub hash: String,
    pub encryption: String,
    pub hmac: String,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            hash: "SHA-256".to_string(),
            encryption: "AES-256-CBC".to_string(),
            hmac: "HMAC-SHA256".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVerify {
    pub ok: bool,
    pub breaks: u32,
}

/// Describes an exported chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub exported_at: String,
    pub timezone: String,
    pub algorithms: Algorithms,
    pub count: usize,
    pub chain_head: Option<String>,
    pub verify: ManifestVerify,
}

impl ExportManifest {
    pub(crate) fn new(count: usize, verification: &ChainVerification) -> Self {
        Self {
            exported_at: now_iso8601(),
            timezone: "UTC".to_string(),
            algorithms: Algorithms::default(),
            count,
            chain_head: verification.head.clone(),
            verify: ManifestVerify {
                ok: verification.ok,
                breaks: verification.breaks,
            },
        }
    }
}

/// An export ready to be written.
#[derive(Debug, Clone)]
pub struct ChainExport {
    /// One block per line, oldest first.
    pub jsonl: String,
    pub manifest: ExportManifest,
}

/// Paths written by [`ChainExport::write_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub jsonl: PathBuf,
    pub manifest: PathBuf,
}

impl ChainExport {
    /// Write `<name>.jsonl` and `<name>.manifest.json` into `dir`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `name` is empty or contains a path separator;
    /// `StorageUnavailable` if either file cannot be written.
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<ExportPaths> {
        validate_export_name(name)?;

        let paths = ExportPaths {
            jsonl: dir.join(format!("{}.jsonl", name)),
            manifest: dir.join(format!("{}.manifest.json", name)),
        };
        let manifest = serde_json::to_string_pretty(&self.manifest)?;

        write_atomic(&paths.jsonl, self.jsonl.as_bytes())?;
        write_atomic(&paths.manifest, manifest.as_bytes())?;
        Ok(paths)
    }
}

/// Default export name, e.g. `strongbox-chain-20240101T000000Z`.
pub fn default_export_name() -> String {
    format!(
        "strongbox-chain-{}",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
    )
}

fn validate_export_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(VaultError::InvalidInput(format!(
            "Invalid export name: {:?}",
            name
        )));
    }
    Ok(())
}
